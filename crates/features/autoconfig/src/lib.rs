//! # Auto-Configuration
//!
//! Sizes a PostgreSQL server to the container it runs in. Runs inside the image
//! entrypoint before the server starts.
//!
//! ## Pipeline
//!
//! 1.  **Preflight:** refuses to continue without `POSTGRES_PASSWORD` unless trust
//!     authentication was requested.
//! 2.  **Detection ([`detector`]):** RAM from `POSTGRES_MEMORY`, the cgroup v2 limit,
//!     the cgroup v1 limit or `/proc/meminfo`; CPU from the cgroup v2 quota or the host.
//! 3.  **Sizing ([`sizer`]):** tiered rules turning RAM and cores into [`Tuning`].
//! 4.  **Writing ([`writer`]):** a managed block in `postgresql.conf`, rewritten in place on
//!     every start.
//!
//! `POSTGRES_SKIP_AUTOCONFIG=true` bypasses steps 2 to 4 and leaves the server defaults.
//!
//! Every decision is logged with the `[AUTO-CONFIG]` tag so container logs can be
//! asserted on verbatim.

pub mod detector;
pub mod env;
mod error;
pub mod sizer;
pub mod writer;

pub use crate::detector::Detector;
pub use crate::env::AutoConfigEnv;
pub use crate::error::{AutoConfigError, AutoConfigErrorExt};
pub use crate::writer::Settings;

use pgpack_domain::autoconfig::{AutoConfigDecision, Tuning};
use pgpack_domain::constants::{AUTO_CONFIG_TAG, ENV_SKIP_AUTOCONFIG};
use std::path::PathBuf;
use tracing::{error, info};

const DEFAULT_LISTEN_ADDRESSES: &str = "*";

/// A computed decision together with the full settings list to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoConfigPlan {
    pub decision: AutoConfigDecision,
    pub settings: Settings,
}

/// One configured auto-configuration pass.
///
/// # Example
///
/// ```rust
/// use pgpack_autoconfig::{AutoConfig, AutoConfigEnv};
///
/// let env = AutoConfigEnv::from_vars([
///     ("POSTGRES_PASSWORD", "secret"),
///     ("POSTGRES_MEMORY", "1536"),
/// ]);
/// let plan = AutoConfig::builder().env(env).host_cpus(2).build().plan().unwrap().unwrap();
/// assert_eq!(plan.decision.tuning.shared_buffers_mb, 384);
/// ```
#[derive(Debug, Clone)]
pub struct AutoConfig {
    env: AutoConfigEnv,
    detector: Detector,
    config_file: Option<PathBuf>,
    default_preload: Vec<String>,
}

#[derive(Debug, Default)]
pub struct AutoConfigBuilder {
    env: Option<AutoConfigEnv>,
    root: Option<PathBuf>,
    host_cpus: Option<u32>,
    config_file: Option<PathBuf>,
    default_preload: Vec<String>,
}

impl AutoConfigBuilder {
    /// Container variables; defaults to the process environment.
    #[must_use]
    pub fn env(mut self, env: AutoConfigEnv) -> Self {
        self.env = Some(env);
        self
    }

    /// Filesystem root holding `sys/fs/cgroup` and `proc`; defaults to `/`.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub const fn host_cpus(mut self, cpus: u32) -> Self {
        self.host_cpus = Some(cpus);
        self
    }

    /// The `postgresql.conf` receiving the managed block.
    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Libraries preloaded when `POSTGRES_SHARED_PRELOAD_LIBRARIES` is unset.
    #[must_use]
    pub fn default_preload<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_preload = libraries.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn build(self) -> AutoConfig {
        let mut detector = self.root.map_or_else(Detector::default, Detector::new);
        if let Some(cpus) = self.host_cpus {
            detector = detector.with_host_cpus(cpus);
        }
        AutoConfig {
            env: self.env.unwrap_or_else(AutoConfigEnv::from_env),
            detector,
            config_file: self.config_file,
            default_preload: self.default_preload,
        }
    }
}

impl AutoConfig {
    #[must_use]
    pub fn builder() -> AutoConfigBuilder {
        AutoConfigBuilder::default()
    }

    /// Fails when the server could not start with the given credentials.
    ///
    /// # Errors
    /// Returns [`AutoConfigError::MissingPassword`].
    pub fn preflight(&self) -> Result<(), AutoConfigError> {
        if self.env.password.is_none() && !self.env.trusts_host() {
            return Err(AutoConfigError::MissingPassword { context: None });
        }
        Ok(())
    }

    /// Runs preflight, detection and sizing without touching any file.
    ///
    /// Returns `Ok(None)` when auto-configuration is disabled.
    ///
    /// # Errors
    /// Fatal startup errors ([`AutoConfigError::is_fatal`]) and detection failures.
    pub fn plan(&self) -> Result<Option<AutoConfigPlan>, AutoConfigError> {
        self.preflight().inspect_err(|e| error!("{AUTO_CONFIG_TAG} {e}"))?;

        if self.env.skip {
            info!("{AUTO_CONFIG_TAG} Skipped ({ENV_SKIP_AUTOCONFIG}=true)");
            return Ok(None);
        }

        let resources = self.detector.detect(&self.env)?;
        let tuning = sizer::size(resources.ram_mb, resources.cpu_cores)
            .inspect_err(|e| error!("{AUTO_CONFIG_TAG} {e}"))?;

        let settings = self.settings(&tuning);
        Ok(Some(AutoConfigPlan { decision: AutoConfigDecision { resources, tuning }, settings }))
    }

    /// Plans and, when a config file is configured, writes the managed block.
    ///
    /// # Errors
    /// Everything [`AutoConfig::plan`] returns, plus [`AutoConfigError::Io`] on write failure.
    pub fn run(&self) -> Result<Option<AutoConfigDecision>, AutoConfigError> {
        let Some(plan) = self.plan()? else {
            return Ok(None);
        };

        if let Some(path) = &self.config_file {
            writer::write_block(path, &plan.settings)?;
        }
        log_applied(&plan.decision.tuning);

        Ok(Some(plan.decision))
    }

    /// Tuning settings followed by listen address and preload libraries.
    fn settings(&self, tuning: &Tuning) -> Settings {
        let mut settings: Settings =
            tuning.settings().into_iter().map(|(k, v)| (k.to_owned(), v)).collect();

        let listen = self.env.bind_ip.as_deref().unwrap_or(DEFAULT_LISTEN_ADDRESSES);
        settings.push(("listen_addresses".to_owned(), listen.to_owned()));

        let preload = self
            .env
            .shared_preload_libraries
            .clone()
            .unwrap_or_else(|| self.default_preload.join(","));
        if !preload.is_empty() {
            settings.push(("shared_preload_libraries".to_owned(), preload));
        }
        settings
    }
}

fn log_applied(tuning: &Tuning) {
    let summary = tuning
        .settings()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    info!("{AUTO_CONFIG_TAG} Applied: {summary}");
}
