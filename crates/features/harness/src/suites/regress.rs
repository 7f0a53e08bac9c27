//! Expected-output fixtures: `sql/<name>.sql` is run with echo and compared against
//! `expected/<name>.out`.

use super::{SuiteContext, record_error, release};
use crate::error::{HarnessError, HarnessErrorExt};
use crate::expect::Outcome;
use crate::report::Report;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const SUITE: &str = "regress";

/// One `.sql` file with its recorded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub sql: PathBuf,
    pub expected: PathBuf,
}

/// Finds fixtures under `dir/sql`, sorted by name. SQL files without an expected
/// output are skipped with a warning.
///
/// # Errors
/// Returns [`HarnessError::Walk`] when the directory cannot be listed.
pub fn discover(dir: &Path) -> Result<Vec<Fixture>, HarnessError> {
    let sql_dir = dir.join("sql");
    let expected_dir = dir.join("expected");

    let mut fixtures = Vec::new();
    for entry in WalkDir::new(&sql_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.context(format!("listing {}", sql_dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let expected = expected_dir.join(format!("{name}.out"));
        if !expected.is_file() {
            warn!(fixture = name, "No expected output, skipping");
            continue;
        }
        fixtures.push(Fixture { name: name.to_owned(), sql: path.to_path_buf(), expected });
    }
    Ok(fixtures)
}

/// First line where the actual output departs from the recorded one (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub line: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |line: &Option<String>| line.as_deref().map_or_else(|| "<end of output>".to_owned(), |l| format!("'{l}'"));
        write!(f, "line {}: expected {} got {}", self.line, show(&self.expected), show(&self.actual))
    }
}

/// Compares line by line, ignoring trailing whitespace and trailing blank lines.
///
/// # Errors
/// Returns the first [`Mismatch`].
pub fn compare_output(expected: &str, actual: &str) -> Result<(), Mismatch> {
    let expected = normalized(expected);
    let actual = normalized(actual);

    for line in 0..expected.len().max(actual.len()) {
        let (e, a) = (expected.get(line), actual.get(line));
        if e != a {
            return Err(Mismatch {
                line: line + 1,
                expected: e.map(|s| (*s).to_owned()),
                actual: a.map(|s| (*s).to_owned()),
            });
        }
    }
    Ok(())
}

fn normalized(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// # Errors
/// Fixture discovery errors, or [`HarnessError::Internal`] when no fixture is found.
pub async fn run(ctx: &SuiteContext, fixtures_dir: &Path) -> Result<Report, HarnessError> {
    let fixtures = discover(fixtures_dir)?;
    if fixtures.is_empty() {
        return Err(HarnessError::from(format!("no fixtures under {}", fixtures_dir.display())));
    }
    info!(count = fixtures.len(), dir = %fixtures_dir.display(), "Running regression fixtures");

    let mut report = Report::new(SUITE);
    let container = match ctx.acquire(|image| ctx.run_spec(image, SUITE)).await {
        Ok(container) => container,
        Err(e) => {
            record_error(&mut report, "start", &e);
            return Ok(report);
        },
    };

    let psql = ctx.psql(&container);
    if let Err(e) = psql.wait_ready(ctx.ready_timeout(), ctx.poll_interval()).await {
        record_error(&mut report, "startup", &e);
        release(container).await;
        return Ok(report);
    }

    for fixture in &fixtures {
        let outcome = match run_fixture(&psql, fixture).await {
            Ok(Ok(())) => Outcome::pass(&fixture.name),
            Ok(Err(mismatch)) => Outcome::fail(&fixture.name, mismatch.to_string()),
            Err(e) => Outcome::fail(&fixture.name, e.to_string()),
        };
        report.record(outcome);
    }

    release(container).await;
    Ok(report)
}

async fn run_fixture(psql: &crate::psql::Psql<'_>, fixture: &Fixture) -> Result<Result<(), Mismatch>, HarnessError> {
    let sql = fs::read_to_string(&fixture.sql).context(format!("reading {}", fixture.sql.display()))?;
    let expected =
        fs::read_to_string(&fixture.expected).context(format!("reading {}", fixture.expected.display()))?;
    let actual = psql.run_script(&sql).await?;
    Ok(compare_output(&expected, &actual))
}
