//! The auto-configuration scenario table.

use crate::expect::Expectation;
use pgpack_autoconfig::AutoConfigError;
use pgpack_autoconfig::sizer;
use pgpack_domain::constants::{AUTO_CONFIG_TAG, ENV_MEMORY, ENV_SKIP_AUTOCONFIG};
use std::time::Duration;

/// Parameters compared verbatim between the sizer and `SHOW`.
const ROUND_TRIP_PARAMS: &[&str] =
    &["shared_buffers", "max_connections", "work_mem", "max_worker_processes"];

/// One container start with its limits, environment and expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub memory: Option<&'static str>,
    pub cpus: Option<&'static str>,
    pub env: Vec<(&'static str, String)>,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    fn new(name: &'static str) -> Self {
        Self { name, memory: None, cpus: None, env: Vec::new(), expectations: Vec::new() }
    }

    fn memory(mut self, limit: &'static str) -> Self {
        self.memory = Some(limit);
        self
    }

    fn cpus(mut self, cpus: &'static str) -> Self {
        self.cpus = Some(cpus);
        self
    }

    fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.env.push((key, value.into()));
        self
    }

    fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    fn setting(self, name: &str, value: &str) -> Self {
        self.expect(Expectation::setting(name, value))
    }

    fn log(self, pattern: impl Into<String>) -> Self {
        self.expect(Expectation::log(pattern))
    }

    /// Whether the server is expected to come up.
    #[must_use]
    pub fn expects_startup(&self) -> bool {
        !self.expectations.iter().any(|e| matches!(e, Expectation::ExitsNonZero { .. }))
    }
}

/// Every built-in scenario, in execution order.
///
/// `fatal_exit` bounds how long the sub-minimum scenario may take to fail.
///
/// # Errors
/// Propagates sizer errors for the round-trip scenario.
pub fn scenarios(fatal_exit: Duration) -> Result<Vec<Scenario>, AutoConfigError> {
    let tag = AUTO_CONFIG_TAG;
    let mut table = vec![
        Scenario::new("manual-1536")
            .env(ENV_MEMORY, "1536")
            .setting("shared_buffers", "384MB")
            .setting("max_connections", "120")
            .log(format!("{tag} RAM: 1536MB (manual)")),
        Scenario::new("cgroup-512m")
            .memory("512m")
            .setting("shared_buffers", "128MB")
            .setting("max_connections", "80")
            .log(format!("{tag} RAM: 512MB (cgroup")),
        Scenario::new("cgroup-2g")
            .memory("2g")
            .setting("shared_buffers", "512MB")
            .setting("max_connections", "120"),
        Scenario::new("cgroup-4g")
            .memory("4g")
            .setting("shared_buffers", "1024MB")
            .setting("max_connections", "200")
            .expect(Expectation::setting_in_range_mb("work_mem", 4, 6)),
        Scenario::new("cgroup-8g")
            .memory("8g")
            .setting("shared_buffers", "2048MB")
            .setting("max_connections", "200")
            .expect(Expectation::setting_in_range_mb("work_mem", 8, 12)),
        Scenario::new("cgroup-16g")
            .memory("16g")
            .setting("shared_buffers", "3276MB")
            .setting("max_connections", "200")
            .expect(Expectation::setting_in_range_mb("work_mem", 16, 24)),
        Scenario::new("manual-65536")
            .env(ENV_MEMORY, "65536")
            .setting("shared_buffers", "9830MB")
            .setting("max_connections", "200"),
        Scenario::new("below-minimum-256m")
            .memory("256m")
            .expect(Expectation::ExitsNonZero { within: fatal_exit })
            .log("FATAL")
            .log("512MB")
            .log("REQUIRED"),
        Scenario::new("skip-autoconfig")
            .memory("2g")
            .env(ENV_SKIP_AUTOCONFIG, "true")
            .setting("shared_buffers", "128MB")
            .setting("max_connections", "100")
            .log(format!("{tag} Skipped ({ENV_SKIP_AUTOCONFIG}=true)")),
        Scenario::new("invalid-memory-override")
            .memory("2g")
            .env(ENV_MEMORY, "lots")
            .log(format!("{tag} Invalid {ENV_MEMORY} value 'lots'"))
            .setting("shared_buffers", "512MB"),
        Scenario::new("cpu-limited")
            .memory("4g")
            .cpus("2")
            .setting("max_worker_processes", "4")
            .setting("max_parallel_workers", "2")
            .log(format!("{tag} CPU: 2 cores")),
    ];
    table.push(round_trip(2048, 2)?);
    Ok(table)
}

/// Compares `SHOW` with what the sizer renders for the same limits.
fn round_trip(ram_mb: u64, cores: u32) -> Result<Scenario, AutoConfigError> {
    let tuning = sizer::size(ram_mb, cores)?;
    let scenario = Scenario::new("show-round-trip").memory("2g").cpus("2");
    Ok(tuning
        .settings()
        .into_iter()
        .filter(|(name, _)| ROUND_TRIP_PARAMS.contains(name))
        .fold(scenario, |s, (name, value)| s.setting(name, &value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Scenario> {
        scenarios(Duration::from_secs(15)).unwrap()
    }

    #[test]
    fn names_are_unique() {
        let table = table();
        let mut names: Vec<_> = table.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), table.len());
    }

    #[test]
    fn only_the_sub_minimum_scenario_fails_startup() {
        let failing: Vec<_> = table().into_iter().filter(|s| !s.expects_startup()).map(|s| s.name).collect();
        assert_eq!(failing, ["below-minimum-256m"]);
    }

    #[test]
    fn round_trip_uses_sizer_values() {
        let table = table();
        let scenario = table.iter().find(|s| s.name == "show-round-trip").unwrap();
        assert_eq!(
            scenario.expectations,
            [
                Expectation::setting("shared_buffers", "512MB"),
                Expectation::setting("max_connections", "120"),
                Expectation::setting("work_mem", "4MB"),
                Expectation::setting("max_worker_processes", "4"),
            ]
        );
    }

    #[test]
    fn literal_fixtures_are_present() {
        let table = table();
        let manual = table.iter().find(|s| s.name == "manual-1536").unwrap();
        assert!(manual.env.contains(&("POSTGRES_MEMORY", "1536".to_owned())));
        assert!(manual.expectations.contains(&Expectation::setting("shared_buffers", "384MB")));

        let large = table.iter().find(|s| s.name == "manual-65536").unwrap();
        assert!(large.expectations.contains(&Expectation::setting("shared_buffers", "9830MB")));
    }
}
