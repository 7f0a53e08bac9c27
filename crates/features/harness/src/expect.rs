//! Assertions against a running (or failing) container.

use crate::psql::Psql;
use crate::size::{parse_pg_size, settings_equal};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// One thing a scenario asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// `SHOW <name>` equals `value`, comparing sizes by magnitude.
    SettingEquals { name: String, value: String },
    /// `SHOW <name>` is a size within `[min, max]` MB.
    SettingInRangeMb { name: String, min: u64, max: u64 },
    /// The container log contains the literal pattern.
    LogContains(String),
    /// The container stops with a non-zero exit code before `within` elapses.
    ExitsNonZero { within: Duration },
}

impl Expectation {
    pub fn setting(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SettingEquals { name: name.into(), value: value.into() }
    }

    pub fn setting_in_range_mb(name: impl Into<String>, min: u64, max: u64) -> Self {
        Self::SettingInRangeMb { name: name.into(), min, max }
    }

    pub fn log(pattern: impl Into<String>) -> Self {
        Self::LogContains(pattern.into())
    }

    /// Whether the server must be accepting connections before this can be checked.
    #[must_use]
    pub const fn needs_server(&self) -> bool {
        matches!(self, Self::SettingEquals { .. } | Self::SettingInRangeMb { .. })
    }

    /// Evaluates the expectation; `Err` carries the mismatch detail.
    pub async fn check(&self, psql: &Psql<'_>, poll: Duration) -> Result<(), String> {
        match self {
            Self::SettingEquals { name, value } => {
                let actual = psql.show(name).await.map_err(|e| e.to_string())?;
                check_setting(value, &actual)
            },
            Self::SettingInRangeMb { name, min, max } => {
                let actual = psql.show(name).await.map_err(|e| e.to_string())?;
                check_range_mb(&actual, *min, *max)
            },
            Self::LogContains(pattern) => {
                let logs = psql.container().logs().await.map_err(|e| e.to_string())?;
                check_log(&logs, pattern)
            },
            Self::ExitsNonZero { within } => {
                let deadline = Instant::now() + *within;
                loop {
                    let state = psql.container().state().await.map_err(|e| e.to_string())?;
                    if !state.running {
                        return check_exit(state.exit_code);
                    }
                    if Instant::now() >= deadline {
                        return Err(format!(
                            "expected exit with non-zero code within {}s, got still {}",
                            within.as_secs(),
                            state.status
                        ));
                    }
                    sleep(poll).await;
                }
            },
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SettingEquals { name, value } => write!(f, "{name} = {value}"),
            Self::SettingInRangeMb { name, min, max } => write!(f, "{name} in [{min}, {max}]MB"),
            Self::LogContains(pattern) => write!(f, "log contains '{pattern}'"),
            Self::ExitsNonZero { within } => write!(f, "exits non-zero within {}s", within.as_secs()),
        }
    }
}

/// # Errors
/// `expected X got Y` when the values differ.
pub fn check_setting(expected: &str, actual: &str) -> Result<(), String> {
    if settings_equal(expected, actual) {
        Ok(())
    } else {
        Err(format!("expected {expected} got {}", actual.trim()))
    }
}

/// # Errors
/// When `actual` is not a size or falls outside the range.
pub fn check_range_mb(actual: &str, min: u64, max: u64) -> Result<(), String> {
    let Some(kb) = parse_pg_size(actual) else {
        return Err(format!("expected a size in [{min}, {max}]MB got {}", actual.trim()));
    };
    if (min * 1024..=max * 1024).contains(&kb) {
        Ok(())
    } else {
        Err(format!("expected [{min}, {max}]MB got {}", actual.trim()))
    }
}

/// # Errors
/// When the pattern is missing; the detail shows the last log lines.
pub fn check_log(logs: &str, pattern: &str) -> Result<(), String> {
    if logs.contains(pattern) {
        Ok(())
    } else {
        Err(format!("expected log line containing '{pattern}' got:\n{}", crate::psql::tail(logs, 10)))
    }
}

/// # Errors
/// When the exit code is zero.
pub fn check_exit(code: i32) -> Result<(), String> {
    if code == 0 { Err("expected non-zero exit code got 0".to_owned()) } else { Ok(()) }
}

/// The result of one expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub name: String,
    pub passed: bool,
    pub detail: Option<String>,
}

impl Outcome {
    pub fn pass(name: impl Into<String>) -> Self {
        Self { name: name.into(), passed: true, detail: None }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { name: name.into(), passed: false, detail: Some(detail.into()) }
    }

    pub fn from_result(name: impl Into<String>, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(name),
            Err(detail) => Self::fail(name, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_mismatch_prints_both_values() {
        assert!(check_setting("2GB", "2048MB").is_ok());
        assert_eq!(check_setting("384MB", "128MB\n"), Err("expected 384MB got 128MB".to_owned()));
    }

    #[test]
    fn range_accepts_bounds() {
        assert!(check_range_mb("16MB", 16, 24).is_ok());
        assert!(check_range_mb("24MB", 16, 24).is_ok());
        assert!(check_range_mb("21MB", 16, 24).is_ok());
        assert_eq!(check_range_mb("4MB", 16, 24), Err("expected [16, 24]MB got 4MB".to_owned()));
        assert!(check_range_mb("on", 16, 24).is_err());
    }

    #[test]
    fn log_and_exit_checks() {
        let logs = "INFO [AUTO-CONFIG] RAM: 1536MB (manual)\nINFO [AUTO-CONFIG] CPU: 2 cores (nproc)\n";
        assert!(check_log(logs, "[AUTO-CONFIG] RAM: 1536MB (manual)").is_ok());
        let err = check_log(logs, "RAM: 2048MB").unwrap_err();
        assert!(err.starts_with("expected log line containing 'RAM: 2048MB' got:"));

        assert!(check_exit(1).is_ok());
        assert!(check_exit(0).is_err());
    }

    #[test]
    fn labels_read_naturally() {
        assert_eq!(Expectation::setting("shared_buffers", "384MB").to_string(), "shared_buffers = 384MB");
        assert_eq!(
            Expectation::ExitsNonZero { within: Duration::from_secs(15) }.to_string(),
            "exits non-zero within 15s"
        );
        assert!(!Expectation::log("FATAL").needs_server());
    }

    #[test]
    fn outcome_from_result() {
        assert!(Outcome::from_result("a", Ok(())).passed);
        let failed = Outcome::from_result("b", Err("expected 1 got 2".into()));
        assert!(!failed.passed);
        assert_eq!(failed.detail.as_deref(), Some("expected 1 got 2"));
    }
}
