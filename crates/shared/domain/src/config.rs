use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level harness configuration (`pgpack.toml` + `PGPACK__*` overrides).
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessConfigInner {
    pub docker: DockerConfig,
    pub postgres: PostgresConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub manifest: ManifestConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into suites.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    #[serde(flatten, default)]
    inner: Arc<HarnessConfigInner>,
}

impl Deref for HarnessConfig {
    type Target = HarnessConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for HarnessConfig {
    fn deref_mut(&mut self) -> &mut HarnessConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// How to reach the Docker engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// CLI binary (`docker`, `podman`, or an absolute path).
    pub binary: String,
    /// Prefix for generated container names.
    pub name_prefix: String,
}

/// Credentials and defaults passed to every test container.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Polling and deadline settings, in seconds unless noted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long to wait for `pg_isready`.
    pub ready_secs: u64,
    /// How quickly a container must exit when a fatal startup error is expected.
    pub fatal_exit_secs: u64,
    pub poll_interval_ms: u64,
}

/// Backoff for transient errors (connection refused, "starting up").
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub path: PathBuf,
}

// --- Default ---

impl Default for DockerConfig {
    fn default() -> Self {
        Self { binary: "docker".to_owned(), name_prefix: "pgpack-test".to_owned() }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_owned(),
            password: "pgpack-test-password".to_owned(),
            database: "postgres".to_owned(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { ready_secs: 90, fatal_exit_secs: 15, poll_interval_ms: 500 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { attempts: 5, base_delay_ms: 500, max_delay_ms: 8_000 }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("extensions.manifest.json") }
    }
}
