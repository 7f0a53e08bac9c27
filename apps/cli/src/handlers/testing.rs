use crate::models::args::{ImageArgs, TestSuite};
use anyhow::{Context, Result, bail};
use pgpack_domain::config::HarnessConfig;
use pgpack_harness::suites::{autoconfig, extensions, regress};
use pgpack_harness::{Report, SuiteContext, Target};
use std::process::ExitCode;
use tokio::signal;
use tracing::warn;

/// Exit code reported when a suite is interrupted by SIGINT or SIGTERM.
const INTERRUPTED: u8 = 130;

/// Runs one suite, racing it against shutdown signals.
///
/// On a signal the suite future is dropped, which removes every container it still
/// owns, and the process exits with 130.
///
/// # Errors
/// Returns an error for invalid arguments, manifests or fixture directories, and when
/// signal handlers cannot be installed.
pub async fn run(config: HarnessConfig, suite: TestSuite) -> Result<ExitCode> {
    let outcome = tokio::select! {
        report = run_suite(config, suite) => Some(report?),
        res = shutdown_signal() => {
            res?;
            None
        },
    };

    let Some(report) = outcome else {
        warn!("Interrupted, test containers removed");
        return Ok(ExitCode::from(INTERRUPTED));
    };

    report.log_summary();
    println!("{}", report.summary());
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run_suite(config: HarnessConfig, suite: TestSuite) -> Result<Report> {
    match suite {
        TestSuite::AutoConfig { image, only } => {
            let tag = required_image(&image)?.to_owned();
            let ctx = SuiteContext::new(config, Target::Image(tag.clone()));
            Ok(autoconfig::run(&ctx, &tag, only.as_deref()).await?)
        },
        TestSuite::Extensions { image, container, manifest } => {
            let manifest = manifest.unwrap_or_else(|| config.manifest.path.clone());
            let ctx = SuiteContext::new(config, target(&image, container)?);
            extensions::run(&ctx, &manifest)
                .await
                .with_context(|| format!("Extension suite failed for {}", manifest.display()))
        },
        TestSuite::Regress { image, container, fixtures } => {
            let ctx = SuiteContext::new(config, target(&image, container)?);
            Ok(regress::run(&ctx, &fixtures).await?)
        },
    }
}

fn required_image(image: &ImageArgs) -> Result<&str> {
    match image.resolve() {
        Some(tag) => Ok(tag),
        None => bail!("An image tag is required (IMAGE or --image=<tag>)"),
    }
}

fn target(image: &ImageArgs, container: Option<String>) -> Result<Target> {
    match container {
        Some(name) => Ok(Target::Container(name)),
        None => Ok(Target::Image(required_image(image)?.to_owned())),
    }
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    Ok(())
}
