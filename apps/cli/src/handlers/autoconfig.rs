use crate::models::args::{AutoconfigArgs, Emit};
use anyhow::{Context, Result, bail};
use pgpack_autoconfig::{AutoConfig, AutoConfigBuilder, AutoConfigEnv, AutoConfigError, writer};
use pgpack_manifest::ManifestExt;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const CONFIG_FILE_NAME: &str = "postgresql.conf";

/// Runs one auto-configuration pass inside the container.
///
/// Fatal startup errors (sub-minimum memory, missing password) print their `FATAL` line
/// and map to exit code 1 so the entrypoint stops before the server starts.
///
/// # Errors
/// Returns an error when the manifest cannot be read, no config file can be located,
/// or detection and writing fail.
pub fn run(args: &AutoconfigArgs) -> Result<ExitCode> {
    let builder = builder(args)?;

    let result = match args.emit {
        Emit::File => {
            let path = config_file(args)?;
            builder.config_file(path).build().run().map(|_| ())
        },
        Emit::Args => builder.build().plan().map(|plan| {
            for arg in plan.map(|p| writer::render_args(&p.settings)).unwrap_or_default() {
                println!("{arg}");
            }
        }),
        Emit::Json => match builder.build().plan() {
            Ok(plan) => {
                let json = serde_json::to_string_pretty(&plan.map(|p| p.decision))
                    .context("Failed to serialize decision")?;
                println!("{json}");
                Ok(())
            },
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => fail(e),
    }
}

fn builder(args: &AutoconfigArgs) -> Result<AutoConfigBuilder> {
    let builder = AutoConfig::builder().env(AutoConfigEnv::from_env()).root(&args.root);
    let Some(path) = &args.manifest else {
        return Ok(builder);
    };

    let manifest = pgpack_manifest::load(path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;
    manifest.validate()?;
    Ok(builder.default_preload(manifest.preload_libraries()?))
}

fn config_file(args: &AutoconfigArgs) -> Result<PathBuf> {
    if let Some(path) = &args.config_file {
        return Ok(path.clone());
    }
    match args.pgdata.clone().or_else(|| env::var_os("PGDATA").map(PathBuf::from)) {
        Some(pgdata) => Ok(pgdata.join(CONFIG_FILE_NAME)),
        None => bail!("--emit file needs --config-file, --pgdata or PGDATA"),
    }
}

fn fail(error: AutoConfigError) -> Result<ExitCode> {
    if error.is_fatal() {
        eprintln!("{error}");
        return Ok(ExitCode::FAILURE);
    }
    Err(error).context("Auto-configuration failed")
}
