//! Creates every manifest extension in dependency order and verifies it is installed.

use super::{SuiteContext, record_error, release};
use crate::error::HarnessError;
use crate::expect::{Outcome, check_setting};
use crate::psql::{Psql, is_transient};
use crate::report::Report;
use pgpack_domain::constants::ENV_SHARED_PRELOAD_LIBRARIES;
use pgpack_manifest::{ExtensionEntry, ManifestExt};
use std::path::Path;
use tracing::info;

pub const SUITE: &str = "extensions";

/// # Errors
/// Manifest load, validation and ordering errors. Container and SQL failures are
/// reported as failed outcomes.
pub async fn run(ctx: &SuiteContext, manifest_path: &Path) -> Result<Report, HarnessError> {
    let manifest = pgpack_manifest::load(manifest_path)?;
    manifest.validate()?;
    let creatable = manifest.creatable()?;
    let preload = manifest.preload_libraries()?.join(",");
    let hooks: Vec<&ExtensionEntry> =
        manifest.resolve_order()?.into_iter().filter(|e| e.needs_preload() && !e.needs_create()).collect();

    info!(create = creatable.len(), hooks = hooks.len(), preload = %preload, "Extension plan");

    let mut report = Report::new(SUITE);
    let container = match ctx
        .acquire(|image| ctx.run_spec(image, SUITE).env(ENV_SHARED_PRELOAD_LIBRARIES, &preload))
        .await
    {
        Ok(container) => container,
        Err(e) => {
            record_error(&mut report, "start", &e);
            return Ok(report);
        },
    };

    let psql = ctx.psql(&container);
    if let Err(e) = psql.wait_ready(ctx.ready_timeout(), ctx.poll_interval()).await {
        record_error(&mut report, "startup", &e);
        release(container).await;
        return Ok(report);
    }

    for entry in &creatable {
        let outcome = create_extension(ctx, &psql, entry).await;
        report.record(outcome);
    }

    if !hooks.is_empty() {
        match psql.show("shared_preload_libraries").await {
            Ok(loaded) => {
                for entry in &hooks {
                    report.record(Outcome::from_result(
                        format!("{} (preloaded)", entry.name),
                        check_preloaded(&loaded, &entry.name),
                    ));
                }
            },
            Err(e) => record_error(&mut report, "shared_preload_libraries", &e),
        }
    }

    release(container).await;
    Ok(report)
}

async fn create_extension(ctx: &SuiteContext, psql: &Psql<'_>, entry: &ExtensionEntry) -> Outcome {
    let name = entry.name.as_str();
    let create = format!("CREATE EXTENSION IF NOT EXISTS \"{name}\" CASCADE");

    let created = ctx.backoff().retry(name, is_transient, || psql.query(&create)).await;
    if let Err(e) = created {
        return Outcome::fail(name, e.to_string());
    }

    let installed =
        psql.query(&format!("SELECT extversion FROM pg_extension WHERE extname = '{name}'")).await;
    match installed {
        Ok(version) if !version.is_empty() => Outcome {
            name: name.to_owned(),
            passed: true,
            detail: Some(format!("version {version}")),
        },
        Ok(_) => Outcome::fail(name, format!("expected {name} in pg_extension got no row")),
        Err(e) => Outcome::fail(name, e.to_string()),
    }
}

/// # Errors
/// When `name` is not one of the comma separated libraries.
fn check_preloaded(loaded: &str, name: &str) -> Result<(), String> {
    if loaded.split(',').map(str::trim).any(|lib| lib == name) {
        Ok(())
    } else {
        check_setting(&format!("{name} in shared_preload_libraries"), loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preload_list_membership() {
        assert!(check_preloaded("pg_stat_statements, auto_explain", "auto_explain").is_ok());
        assert_eq!(
            check_preloaded("pg_stat_statements", "pg_safeupdate"),
            Err("expected pg_safeupdate in shared_preload_libraries got pg_stat_statements".to_owned())
        );
    }
}
