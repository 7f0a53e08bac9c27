//! # Docker
//!
//! A thin async wrapper over the `docker` CLI. Every call spawns the binary with
//! `tokio::process`, captures stdout and stderr, and turns a non-zero exit into a
//! [`DockerError::Command`] carrying the status and stderr.
//!
//! [`ScopedContainer`] ties a container's lifetime to a Rust value so test scenarios
//! clean up on every exit path.

mod container;
mod error;
mod spec;

pub use crate::container::{ContainerState, ScopedContainer};
pub use crate::error::{DockerError, DockerErrorExt};
pub use crate::spec::RunSpec;

use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

const STATE_TEMPLATE: &str = "{{.State.Running}} {{.State.ExitCode}} {{.State.Status}}";

/// Captured result of a command that is allowed to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Handle on the docker CLI. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Docker {
    binary: Arc<str>,
}

impl Default for Docker {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl Docker {
    /// `binary` may be `docker`, `podman` or an absolute path.
    pub fn new(binary: impl AsRef<str>) -> Self {
        Self { binary: Arc::from(binary.as_ref()) }
    }

    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Runs the CLI, feeding `stdin` when given, and returns whatever it produced.
    ///
    /// # Errors
    /// Returns [`DockerError::Io`] when the binary cannot be executed.
    pub async fn raw<I, S>(&self, args: I, stdin: Option<&str>) -> Result<ExecOutput, DockerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&*self.binary);
        cmd.args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .context(format!("spawning '{}', is it installed and in PATH?", self.binary))?;
        if let Some(input) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes()).await.context("writing stdin")?;
            pipe.shutdown().await.context("closing stdin")?;
        }
        let output = child.wait_with_output().await.context("waiting for docker")?;

        Ok(ExecOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Like [`Docker::raw`], but a non-zero exit is an error. Returns trimmed stdout.
    async fn checked(&self, args: &[&str]) -> Result<String, DockerError> {
        let output = self.raw(args, None).await?;
        if output.success() {
            return Ok(output.stdout.trim().to_owned());
        }
        Err(DockerError::Command {
            command: format!("{} {}", self.binary, args.join(" ")),
            status: output.code.map_or_else(|| "signal".to_owned(), |c| format!("exit code {c}")),
            stderr: output.stderr.trim().to_owned(),
            context: None,
        })
    }

    /// `docker run -d ...`; returns the container id.
    ///
    /// # Errors
    /// Returns [`DockerError::Command`] when the container cannot be created.
    pub async fn run(&self, spec: &RunSpec) -> Result<String, DockerError> {
        let args = spec.to_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let id = self.checked(&args).await.context(format!("starting {}", spec.name))?;
        info!(container = %spec.name, image = %spec.image, id = %short_id(&id), "Container started");
        Ok(id)
    }

    /// `docker exec -i <name> <argv...>`. A failing command is not an error here;
    /// callers inspect [`ExecOutput`].
    ///
    /// # Errors
    /// Returns [`DockerError::Io`] when the CLI cannot be executed.
    pub async fn exec(
        &self,
        name: &str,
        argv: &[&str],
        stdin: Option<&str>,
    ) -> Result<ExecOutput, DockerError> {
        let mut args = vec!["exec"];
        if stdin.is_some() {
            args.push("-i");
        }
        args.push(name);
        args.extend_from_slice(argv);
        self.raw(&args, stdin).await
    }

    /// Container output with stdout and stderr merged.
    ///
    /// # Errors
    /// Returns [`DockerError::Command`] when the container does not exist.
    pub async fn logs(&self, name: &str) -> Result<String, DockerError> {
        let output = self.raw(["logs", name], None).await?;
        if !output.success() {
            return Err(DockerError::Command {
                command: format!("{} logs {name}", self.binary),
                status: output.code.map_or_else(|| "signal".to_owned(), |c| format!("exit code {c}")),
                stderr: output.stderr.trim().to_owned(),
                context: None,
            });
        }
        let mut merged = output.stdout;
        merged.push_str(&output.stderr);
        Ok(merged)
    }

    /// # Errors
    /// Returns [`DockerError::Command`] for unknown containers and
    /// [`DockerError::Parse`] for unexpected output.
    pub async fn inspect_state(&self, name: &str) -> Result<ContainerState, DockerError> {
        let raw = self.checked(&["inspect", "-f", STATE_TEMPLATE, name]).await?;
        ContainerState::parse(&raw)
    }

    /// Host address bound to `container_port` (e.g. `5432/tcp`), if published.
    ///
    /// # Errors
    /// Returns [`DockerError::Command`] when the container does not exist.
    pub async fn port(&self, name: &str, container_port: &str) -> Result<Option<String>, DockerError> {
        let output = self.raw(["port", name, container_port], None).await?;
        if !output.success() {
            debug!(container = name, port = container_port, stderr = %output.stderr.trim(), "Port not published");
            return Ok(None);
        }
        Ok(output.stdout.lines().next().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned))
    }

    /// `docker rm -f -v <name>`.
    ///
    /// # Errors
    /// Returns [`DockerError::Command`] when removal fails.
    pub async fn remove(&self, name: &str) -> Result<(), DockerError> {
        self.checked(&["rm", "-f", "-v", name]).await?;
        debug!(container = name, "Container removed");
        Ok(())
    }

    /// Starts a container owned by the returned guard.
    ///
    /// The guard is armed before `docker run`, so a failed or cancelled start still
    /// removes whatever `docker run` left behind.
    ///
    /// # Errors
    /// Returns [`DockerError`] when `docker run` fails.
    pub async fn start(&self, spec: &RunSpec) -> Result<ScopedContainer, DockerError> {
        let container = ScopedContainer::new(self.clone(), spec.name.clone(), true);
        if let Err(e) = self.run(spec).await {
            if let Err(cleanup) = container.release().await {
                warn!(container = %spec.name, error = %cleanup, "Cleanup after failed start failed");
            }
            return Err(e);
        }
        Ok(container)
    }

    /// Wraps an already running container; it is left in place on release.
    ///
    /// # Errors
    /// Returns [`DockerError::NotRunning`] when the container exists but is stopped.
    pub async fn attach(&self, name: &str) -> Result<ScopedContainer, DockerError> {
        let state = self.inspect_state(name).await?;
        if !state.running {
            return Err(DockerError::NotRunning { name: name.to_owned(), context: Some(state.status.into()) });
        }
        info!(container = name, "Reusing running container");
        Ok(ScopedContainer::new(self.clone(), name.to_owned(), false))
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
