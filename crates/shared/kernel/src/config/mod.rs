use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment prefix for configuration overrides (`PGPACK__RETRY__ATTEMPTS=8`).
pub const ENV_PREFIX: &str = "PGPACK";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pgpack.toml";

#[pgpack_derive::pgpack_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Config file not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Layered configuration loader: optional file, then environment overrides.
///
/// 1. **File**: `path` when given (must exist), otherwise `pgpack.toml` in the working
///    directory when present. A missing default file is not an error; every config
///    struct carries defaults.
/// 2. **Environment**: variables prefixed with `PGPACK__`, nested with `__`
///    (e.g. `PGPACK__DOCKER__BINARY=podman` maps to `docker.binary`).
///
/// # Errors
/// Returns [`ConfigError::NotFound`] when an explicit `path` does not exist, and
/// [`ConfigError::Config`] when the sources cannot be merged or deserialized into `T`.
///
/// # Example
/// ```rust
/// use pgpack_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     #[serde(default)]
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// # let _ = cfg.port;
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_config_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_config_with_env<T>(
    path: Option<impl AsRef<Path>>,
    environment: Environment,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (file, required) = match path {
        Some(p) => {
            let p = p.as_ref().to_path_buf();
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    message: p.display().to_string().into(),
                    context: None,
                });
            }
            (p, true)
        },
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if file.exists() {
        info!("Loading config from {}", file.display());
    } else {
        debug!("No config file at {}, using defaults", file.display());
    }

    let builder = Config::builder()
        .add_source(File::from(file.as_path()).required(required))
        .add_source(environment.separator("__").prefix_separator("__").try_parsing(true));

    builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgpack_domain::config::HarnessConfig;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config::<HarnessConfig>(Some("/definitely/missing/pgpack.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pgpack.toml");
        fs::write(&path, "[docker]\nbinary = \"podman\"\n\n[retry]\nattempts = 9\n").unwrap();

        let cfg: HarnessConfig = load_config_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(cfg.docker.binary, "podman");
        assert_eq!(cfg.retry.attempts, 9);
        assert_eq!(cfg.postgres.user, "postgres");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pgpack.toml");
        fs::write(&path, "[timeouts]\nready_secs = 10\n").unwrap();

        let cfg: HarnessConfig = load_config_with_env(
            Some(&path),
            env(&[("PGPACK__TIMEOUTS__READY_SECS", "45"), ("PGPACK__POSTGRES__USER", "tester")]),
        )
        .unwrap();
        assert_eq!(cfg.timeouts.ready_secs, 45);
        assert_eq!(cfg.postgres.user, "tester");
    }
}
