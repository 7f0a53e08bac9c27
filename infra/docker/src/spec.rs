/// Arguments for `docker run -d`.
///
/// # Example
///
/// ```rust
/// use pgpack_docker::RunSpec;
///
/// let spec = RunSpec::new("pgpack:17", "pgpack-test-a1")
///     .memory("512m")
///     .env("POSTGRES_PASSWORD", "secret");
/// assert_eq!(
///     spec.to_args(),
///     ["run", "-d", "--name", "pgpack-test-a1", "--memory", "512m",
///      "-e", "POSTGRES_PASSWORD=secret", "pgpack:17"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub memory: Option<String>,
    pub cpus: Option<String>,
    pub env: Vec<(String, String)>,
    pub publish: Vec<String>,
    pub args: Vec<String>,
}

impl RunSpec {
    pub fn new(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            memory: None,
            cpus: None,
            env: Vec::new(),
            publish: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Memory limit in docker notation (`512m`, `16g`).
    #[must_use]
    pub fn memory(mut self, limit: impl Into<String>) -> Self {
        self.memory = Some(limit.into());
        self
    }

    #[must_use]
    pub fn cpus(mut self, cpus: impl Into<String>) -> Self {
        self.cpus = Some(cpus.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Publishes a port, `host:container` or just `container` for a random host port.
    #[must_use]
    pub fn publish(mut self, mapping: impl Into<String>) -> Self {
        self.publish.push(mapping.into());
        self
    }

    /// Arguments passed to the image entrypoint after the image name.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut out: Vec<String> =
            vec!["run".into(), "-d".into(), "--name".into(), self.name.clone()];
        if let Some(memory) = &self.memory {
            out.extend(["--memory".into(), memory.clone()]);
        }
        if let Some(cpus) = &self.cpus {
            out.extend(["--cpus".into(), cpus.clone()]);
        }
        for (key, value) in &self.env {
            out.extend(["-e".into(), format!("{key}={value}")]);
        }
        for mapping in &self.publish {
            out.extend(["-p".into(), mapping.clone()]);
        }
        out.push(self.image.clone());
        out.extend(self.args.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_argument_order() {
        let spec = RunSpec::new("img:tag", "c1")
            .memory("2g")
            .cpus("2")
            .env("A", "1")
            .env("B", "x=y")
            .publish("5432")
            .arg("-c")
            .arg("log_min_messages=debug1");
        assert_eq!(
            spec.to_args(),
            [
                "run", "-d", "--name", "c1", "--memory", "2g", "--cpus", "2", "-e", "A=1", "-e",
                "B=x=y", "-p", "5432", "img:tag", "-c", "log_min_messages=debug1",
            ]
        );
    }
}
