use crate::{Docker, DockerError, ExecOutput};
use std::process::Stdio;
use tracing::{debug, warn};

/// Runtime state reported by `docker inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub running: bool,
    pub exit_code: i32,
    pub status: String,
}

impl ContainerState {
    /// Parses the `{{.State.Running}} {{.State.ExitCode}} {{.State.Status}}` template output.
    pub(crate) fn parse(raw: &str) -> Result<Self, DockerError> {
        let mut parts = raw.split_whitespace();
        let (Some(running), Some(exit_code), Some(status)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DockerError::Parse { message: format!("inspect state '{raw}'").into(), context: None });
        };
        let running = match running {
            "true" => true,
            "false" => false,
            other => {
                return Err(DockerError::Parse {
                    message: format!("running flag '{other}'").into(),
                    context: None,
                });
            },
        };
        let exit_code = exit_code.parse::<i32>().map_err(|e| DockerError::Parse {
            message: format!("exit code '{exit_code}': {e}").into(),
            context: None,
        })?;
        Ok(Self { running, exit_code, status: status.to_owned() })
    }

    /// Stopped with a non-zero exit code.
    #[must_use]
    pub const fn failed(&self) -> bool {
        !self.running && self.exit_code != 0
    }
}

/// A container whose lifetime is tied to this value.
///
/// Containers created through [`Docker::start`] are removed by [`ScopedContainer::release`]
/// or, failing that, when the value is dropped (error paths, panics, cancelled futures).
/// Containers reused through [`Docker::attach`] are never removed.
#[derive(Debug)]
pub struct ScopedContainer {
    docker: Docker,
    name: String,
    owned: bool,
    released: bool,
}

impl ScopedContainer {
    pub(crate) const fn new(docker: Docker, name: String, owned: bool) -> Self {
        Self { docker, name, owned, released: false }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the container is removed on release.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.owned
    }

    #[must_use]
    pub const fn docker(&self) -> &Docker {
        &self.docker
    }

    /// See [`Docker::exec`].
    ///
    /// # Errors
    /// Returns [`DockerError::Io`] when the CLI cannot be executed.
    pub async fn exec(&self, argv: &[&str], stdin: Option<&str>) -> Result<ExecOutput, DockerError> {
        self.docker.exec(&self.name, argv, stdin).await
    }

    /// See [`Docker::logs`].
    ///
    /// # Errors
    /// Returns [`DockerError`] when the logs cannot be fetched.
    pub async fn logs(&self) -> Result<String, DockerError> {
        self.docker.logs(&self.name).await
    }

    /// See [`Docker::inspect_state`].
    ///
    /// # Errors
    /// Returns [`DockerError`] when the container cannot be inspected.
    pub async fn state(&self) -> Result<ContainerState, DockerError> {
        self.docker.inspect_state(&self.name).await
    }

    /// Removes an owned container and disarms the drop guard.
    ///
    /// # Errors
    /// Returns [`DockerError`] when `docker rm` fails.
    pub async fn release(mut self) -> Result<(), DockerError> {
        if self.owned {
            self.docker.remove(&self.name).await?;
        }
        self.released = true;
        Ok(())
    }
}

/// Fallback for guards that were never released: runs `docker rm -f -v` synchronously,
/// blocking the current thread (a tokio worker included) until the CLI exits.
impl Drop for ScopedContainer {
    fn drop(&mut self) {
        if self.released || !self.owned {
            return;
        }
        debug!(container = %self.name, "Removing container on drop");
        let result = std::process::Command::new(self.docker.binary())
            .args(["rm", "-f", "-v", &self.name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => {},
            Ok(status) => warn!(container = %self.name, %status, "Cleanup on drop failed"),
            Err(e) => warn!(container = %self.name, error = %e, "Cleanup on drop failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inspect_template() {
        let state = ContainerState::parse("false 1 exited\n").unwrap();
        assert_eq!(state, ContainerState { running: false, exit_code: 1, status: "exited".into() });
        assert!(state.failed());

        let state = ContainerState::parse("true 0 running").unwrap();
        assert!(state.running);
        assert!(!state.failed());
    }

    #[test]
    fn rejects_garbage() {
        assert!(ContainerState::parse("").is_err());
        assert!(ContainerState::parse("yes 0 running").is_err());
        assert!(ContainerState::parse("false x exited").is_err());
    }
}
