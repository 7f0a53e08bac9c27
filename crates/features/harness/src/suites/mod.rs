//! End-to-end suites. Each acquires its own scoped containers and returns a [`Report`].

pub mod autoconfig;
pub mod extensions;
pub mod regress;

use crate::error::HarnessError;
use crate::psql::Psql;
use crate::report::Report;
use pgpack_docker::{Docker, RunSpec, ScopedContainer};
use pgpack_domain::config::HarnessConfig;
use pgpack_domain::constants::{ENV_DB, ENV_PASSWORD, ENV_USER, POSTGRES_PORT};
use pgpack_kernel::retry::Backoff;
use pgpack_kernel::safe_nanoid;
use std::time::Duration;
use tracing::warn;

/// Where a suite gets its server from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Start fresh containers from this image.
    Image(String),
    /// Reuse a running container; it is never removed.
    Container(String),
}

/// Shared state handed to every suite.
#[derive(Debug, Clone)]
pub struct SuiteContext {
    pub config: HarnessConfig,
    pub docker: Docker,
    pub target: Target,
}

impl SuiteContext {
    #[must_use]
    pub fn new(config: HarnessConfig, target: Target) -> Self {
        let docker = Docker::new(&config.docker.binary);
        Self { config, docker, target }
    }

    /// A container name that is unique per run: `<prefix>-<label>-<id>`.
    #[must_use]
    pub fn container_name(&self, label: &str) -> String {
        format!("{}-{label}-{}", self.config.docker.name_prefix, safe_nanoid!(6))
    }

    /// Base `docker run` arguments: credentials and a random host port for 5432.
    #[must_use]
    pub fn run_spec(&self, image: &str, label: &str) -> RunSpec {
        let pg = &self.config.postgres;
        RunSpec::new(image, self.container_name(label))
            .env(ENV_PASSWORD, &pg.password)
            .env(ENV_USER, &pg.user)
            .env(ENV_DB, &pg.database)
            .publish(POSTGRES_PORT.to_string())
    }

    /// Starts `spec` or attaches to the configured container.
    ///
    /// # Errors
    /// Returns [`HarnessError::Docker`] when the container cannot be started or found.
    pub async fn acquire(&self, spec: impl FnOnce(&str) -> RunSpec) -> Result<ScopedContainer, HarnessError> {
        let container = match &self.target {
            Target::Image(image) => self.docker.start(&spec(image)).await?,
            Target::Container(name) => self.docker.attach(name).await?,
        };
        Ok(container)
    }

    pub fn psql<'a>(&self, container: &'a ScopedContainer) -> Psql<'a> {
        Psql::new(container, &self.config.postgres)
    }

    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::from(&self.config.retry)
    }

    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.ready_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.timeouts.poll_interval_ms)
    }

    #[must_use]
    pub fn fatal_exit(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.fatal_exit_secs)
    }
}

/// Releases a container, downgrading failures to a warning: the drop guard already
/// covers the error path.
pub(crate) async fn release(container: ScopedContainer) {
    let name = container.name().to_owned();
    if let Err(e) = container.release().await {
        warn!(container = %name, error = %e, "Container cleanup failed");
    }
}

/// Records a setup failure as a failed outcome so the suite still reports.
pub(crate) fn record_error(report: &mut Report, name: &str, err: &HarnessError) {
    report.record(crate::expect::Outcome::fail(name, err.to_string()));
}
