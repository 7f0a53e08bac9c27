//! SQL access through `docker exec ... psql`.

use crate::error::{HarnessError, HarnessErrorExt};
use pgpack_docker::{ExecOutput, ScopedContainer};
use pgpack_domain::config::PostgresConfig;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

const LOG_TAIL_LINES: usize = 20;

/// Messages printed by libpq and the server while it is starting, restarting or
/// briefly unreachable.
const TRANSIENT_MARKERS: &[&str] = &[
    "connection refused",
    "the database system is starting up",
    "could not connect to server",
    "the database system is shutting down",
    "the database system is in recovery mode",
];

/// Whether an error is worth retrying.
#[must_use]
pub fn is_transient(err: &HarnessError) -> bool {
    match err {
        HarnessError::Psql { stderr, .. } => is_transient_message(stderr),
        _ => false,
    }
}

/// Matches libpq transient failures, including a missing server socket.
#[must_use]
pub fn is_transient_message(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
        || (lower.contains("no such file or directory") && lower.contains("socket"))
}

/// psql bound to one container and one role/database.
#[derive(Debug)]
pub struct Psql<'a> {
    container: &'a ScopedContainer,
    user: String,
    database: String,
}

impl<'a> Psql<'a> {
    pub fn new(container: &'a ScopedContainer, postgres: &PostgresConfig) -> Self {
        Self { container, user: postgres.user.clone(), database: postgres.database.clone() }
    }

    #[must_use]
    pub const fn container(&self) -> &'a ScopedContainer {
        self.container
    }

    /// Runs one statement in tuples-only, unaligned mode and returns trimmed output.
    ///
    /// # Errors
    /// Returns [`HarnessError::Psql`] with psql's stderr when the statement fails.
    pub async fn query(&self, sql: &str) -> Result<String, HarnessError> {
        let argv = [
            "psql", "-X", "-v", "ON_ERROR_STOP=1", "-U", &self.user, "-d", &self.database, "-tA",
            "-c", sql,
        ];
        let output = self.container.exec(&argv, None).await?;
        debug!(container = self.container.name(), sql, code = ?output.code, "psql query");
        into_result(output)
    }

    /// `SHOW <param>`.
    ///
    /// # Errors
    /// See [`Psql::query`].
    pub async fn show(&self, param: &str) -> Result<String, HarnessError> {
        if !param.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.') {
            return Err(HarnessError::from(format!("not a setting name: '{param}'")));
        }
        self.query(&format!("SHOW {param}")).await
    }

    /// Feeds a script on stdin with statement echo, the way regression fixtures are
    /// recorded. Errors do not stop the script and appear inline with the output.
    ///
    /// # Errors
    /// Returns [`HarnessError::Docker`] when the exec itself fails.
    pub async fn run_script(&self, sql: &str) -> Result<String, HarnessError> {
        let command = format!(
            "psql -X -a -q -U {} -d {} 2>&1",
            shell_quote(&self.user),
            shell_quote(&self.database)
        );
        let output = self.container.exec(&["sh", "-c", &command], Some(sql)).await?;
        Ok(output.stdout)
    }

    /// Polls `pg_isready` over TCP until the server accepts connections.
    ///
    /// Fails early when the container stops, attaching the tail of its logs.
    ///
    /// # Errors
    /// [`HarnessError::ContainerExited`] or [`HarnessError::Timeout`].
    pub async fn wait_ready(&self, timeout: Duration, interval: Duration) -> Result<(), HarnessError> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.container.state().await?;
            if !state.running {
                let logs = self.container.logs().await.unwrap_or_default();
                return Err(HarnessError::ContainerExited {
                    name: self.container.name().to_owned(),
                    exit_code: state.exit_code,
                    logs: tail(&logs, LOG_TAIL_LINES),
                    context: None,
                });
            }

            let probe = self
                .container
                .exec(&["pg_isready", "-h", "127.0.0.1", "-U", &self.user, "-d", &self.database], None)
                .await?;
            if probe.success() {
                debug!(container = self.container.name(), "Server is ready");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::Timeout {
                    what: "pg_isready".into(),
                    secs: timeout.as_secs(),
                    context: Some(self.container.name().to_owned().into()),
                });
            }
            sleep(interval).await;
        }
    }
}

fn into_result(output: ExecOutput) -> Result<String, HarnessError> {
    if output.success() {
        Ok(output.stdout.trim().to_owned())
    } else {
        Err(HarnessError::Psql { stderr: output.stderr.trim().to_owned(), context: None })
            .context(format!("exit code {}", output.code.unwrap_or(-1)))
    }
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// Last `n` lines of `text`.
#[must_use]
pub fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
