use crate::expect::Outcome;
use tracing::{error, info};

/// Outcomes of one suite run.
#[derive(Debug, Default)]
pub struct Report {
    suite: String,
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn new(suite: impl Into<String>) -> Self {
        Self { suite: suite.into(), outcomes: Vec::new() }
    }

    /// Records and logs one outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match &outcome.detail {
            None if outcome.passed => info!(suite = %self.suite, "PASS {}", outcome.name),
            Some(detail) if outcome.passed => info!(suite = %self.suite, "PASS {} ({detail})", outcome.name),
            Some(detail) => error!(suite = %self.suite, "FAIL {}: {detail}", outcome.name),
            None => error!(suite = %self.suite, "FAIL {}", outcome.name),
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    #[must_use]
    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    /// True when at least one check ran and none failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.outcomes.is_empty() && self.failed().next().is_none()
    }

    /// Multi-line summary: totals, then every failure with its detail.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.outcomes.len();
        let mut out = format!("{}: {}/{total} passed", self.suite, self.passed());
        for outcome in self.failed() {
            out.push_str("\n  FAIL ");
            out.push_str(&outcome.name);
            if let Some(detail) = &outcome.detail {
                out.push_str(": ");
                out.push_str(detail);
            }
        }
        out
    }

    /// Logs the summary at the level matching the result.
    pub fn log_summary(&self) {
        if self.is_success() {
            info!("{}", self.summary());
        } else {
            error!("{}", self.summary());
        }
    }
}
