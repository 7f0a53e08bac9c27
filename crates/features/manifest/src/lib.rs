//! # Extension Manifest
//!
//! Reads `extensions.manifest.json`, the declarative list of every extension, builtin
//! module and schema bundled in the image, and turns it into the orders the build and
//! the test harness consume.
//!
//! * [`ManifestExt::validate`] checks names and provenance pins.
//! * [`ManifestExt::resolve_order`] is a deterministic topological sort of enabled entries.
//! * [`ManifestExt::preload_libraries`] and [`ManifestExt::creatable`] project that order
//!   onto `shared_preload_libraries` and `CREATE EXTENSION`.

mod error;
mod resolve;
mod validate;

pub use crate::error::{ManifestError, ManifestErrorExt};
pub use pgpack_domain::manifest::{ExtensionEntry, ExtensionKind, Manifest, RuntimeSpec, Source};

use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads and parses a manifest file.
///
/// # Errors
/// Returns [`ManifestError::Io`] when the file cannot be read and [`ManifestError::Json`]
/// when it is not a manifest.
pub fn load(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).context(format!("reading {}", path.display()))?;
    let manifest = from_json(&raw).context(format!("parsing {}", path.display()))?;
    debug!(path = %path.display(), entries = manifest.entries.len(), "Manifest loaded");
    Ok(manifest)
}

/// Parses a manifest from JSON text.
///
/// # Errors
/// Returns [`ManifestError::Json`] on malformed input.
pub fn from_json(raw: &str) -> Result<Manifest, ManifestError> {
    Ok(serde_json::from_str(raw)?)
}

/// Operations over a loaded [`Manifest`].
pub trait ManifestExt {
    /// Validates names, git pins and self-dependencies.
    ///
    /// # Errors
    /// Returns one [`ManifestError::Invalid`] listing every problem found.
    fn validate(&self) -> Result<(), ManifestError>;

    /// Enabled entries, in manifest order.
    fn enabled(&self) -> Vec<&ExtensionEntry>;

    /// Enabled entries with every dependency placed before its dependents.
    ///
    /// # Errors
    /// Duplicate names, unknown dependencies, dependencies on disabled entries and cycles.
    fn resolve_order(&self) -> Result<Vec<&ExtensionEntry>, ManifestError>;

    /// Library names for `shared_preload_libraries`, in resolved order.
    ///
    /// # Errors
    /// Same as [`ManifestExt::resolve_order`].
    fn preload_libraries(&self) -> Result<Vec<&str>, ManifestError>;

    /// Resolved entries that are activated with `CREATE EXTENSION`.
    ///
    /// # Errors
    /// Same as [`ManifestExt::resolve_order`].
    fn creatable(&self) -> Result<Vec<&ExtensionEntry>, ManifestError>;
}

impl ManifestExt for Manifest {
    fn validate(&self) -> Result<(), ManifestError> {
        validate::validate(self)
    }

    fn enabled(&self) -> Vec<&ExtensionEntry> {
        self.entries.iter().filter(|e| e.enabled).collect()
    }

    fn resolve_order(&self) -> Result<Vec<&ExtensionEntry>, ManifestError> {
        resolve::resolve_order(self)
    }

    fn preload_libraries(&self) -> Result<Vec<&str>, ManifestError> {
        Ok(self
            .resolve_order()?
            .into_iter()
            .filter(|e| e.needs_preload())
            .map(|e| e.name.as_str())
            .collect())
    }

    fn creatable(&self) -> Result<Vec<&ExtensionEntry>, ManifestError> {
        Ok(self.resolve_order()?.into_iter().filter(|e| e.needs_create()).collect())
    }
}
