//! Starts one container per auto-configuration scenario and checks the outcome.

use super::{SuiteContext, record_error, release};
use crate::error::HarnessError;
use crate::expect::Outcome;
use crate::report::Report;
use crate::scenario::{Scenario, scenarios};
use tracing::info;

pub const SUITE: &str = "auto-config";

/// Runs every scenario, or just `only`, against fresh containers of `image`.
///
/// # Errors
/// Returns [`HarnessError::Internal`] when `only` names no scenario. Container failures
/// are reported as failed outcomes instead.
pub async fn run(ctx: &SuiteContext, image: &str, only: Option<&str>) -> Result<Report, HarnessError> {
    let table = scenarios(ctx.fatal_exit()).map_err(|e| HarnessError::from(e.to_string()))?;
    let selected = select(table, only)?;

    let mut report = Report::new(SUITE);
    for scenario in &selected {
        run_scenario(ctx, image, scenario, &mut report).await;
    }
    Ok(report)
}

fn select(table: Vec<Scenario>, only: Option<&str>) -> Result<Vec<Scenario>, HarnessError> {
    let Some(only) = only else {
        return Ok(table);
    };
    let known: Vec<&str> = table.iter().map(|s| s.name).collect();
    let selected: Vec<Scenario> = table.iter().filter(|s| s.name == only).cloned().collect();
    if selected.is_empty() {
        return Err(HarnessError::from(format!(
            "unknown scenario '{only}', expected one of: {}",
            known.join(", ")
        )));
    }
    Ok(selected)
}

async fn run_scenario(ctx: &SuiteContext, image: &str, scenario: &Scenario, report: &mut Report) {
    info!(scenario = scenario.name, "Starting scenario");

    let mut spec = ctx.run_spec(image, scenario.name);
    if let Some(memory) = scenario.memory {
        spec = spec.memory(memory);
    }
    if let Some(cpus) = scenario.cpus {
        spec = spec.cpus(cpus);
    }
    for (key, value) in &scenario.env {
        spec = spec.env(*key, value);
    }

    let container = match ctx.docker.start(&spec).await {
        Ok(container) => container,
        Err(e) => {
            record_error(report, &format!("{} / start", scenario.name), &e.into());
            return;
        },
    };

    let psql = ctx.psql(&container);
    if scenario.expects_startup()
        && let Err(e) = psql.wait_ready(ctx.ready_timeout(), ctx.poll_interval()).await
    {
        record_error(report, &format!("{} / startup", scenario.name), &e);
        release(container).await;
        return;
    }

    for expectation in &scenario.expectations {
        let result = expectation.check(&psql, ctx.poll_interval()).await;
        report.record(Outcome::from_result(format!("{} / {expectation}", scenario.name), result));
    }

    release(container).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn table() -> Vec<Scenario> {
        scenarios(Duration::from_secs(15)).unwrap()
    }

    #[test]
    fn select_all_by_default() {
        assert_eq!(select(table(), None).unwrap().len(), table().len());
    }

    #[test]
    fn select_single_scenario() {
        let selected = select(table(), Some("cgroup-16g")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "cgroup-16g");
    }

    #[test]
    fn unknown_scenario_lists_choices() {
        let err = select(table(), Some("cgroup-3g")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown scenario 'cgroup-3g'"));
        assert!(message.contains("manual-1536"));
    }
}
