use crate::models::args::ManifestAction;
use anyhow::{Context, Result};
use pgpack_manifest::{ExtensionEntry, ManifestExt};
use std::path::Path;
use std::process::ExitCode;

/// # Errors
/// Returns an error when the manifest cannot be loaded, is invalid, or its
/// dependencies cannot be ordered.
pub fn run(action: &ManifestAction, path: &Path) -> Result<ExitCode> {
    let manifest = pgpack_manifest::load(path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;

    match action {
        ManifestAction::Order {} => {
            manifest.validate()?;
            for entry in manifest.resolve_order()? {
                println!("{}", entry.name);
            }
        },
        ManifestAction::List {} => render_table(&manifest.entries),
        ManifestAction::Preload {} => {
            manifest.validate()?;
            println!("{}", manifest.preload_libraries()?.join(","));
        },
        ManifestAction::Validate {} => {
            manifest.validate()?;
            let order = manifest.resolve_order()?;
            println!(
                "✅ {}: {} entries, {} enabled, dependency order resolved",
                path.display(),
                manifest.entries.len(),
                order.len()
            );
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn render_table(entries: &[ExtensionEntry]) {
    if entries.is_empty() {
        println!("ℹ️ No entries in manifest.");
        return;
    }

    println!("{:<28} {:<10} {:<16} {:<8} {:<30}", "Name", "Kind", "Category", "Enabled", "Pin");
    println!("{:-<96}", "");

    for entry in entries {
        let enabled = if entry.enabled { "yes" } else { "no" };
        println!(
            "{:<28} {:<10} {:<16} {:<8} {:<30}",
            entry.name,
            entry.kind.to_string(),
            entry.category,
            enabled,
            entry.source.pin()
        );
        if let Some(reason) = entry.disabled_reason.as_deref().filter(|_| !entry.enabled) {
            println!("{:<28} disabled: {reason}", "");
        }
    }
}
