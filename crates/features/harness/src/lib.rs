//! # Container Test Harness
//!
//! Spins up containers of the packaged image through the `docker` CLI, talks to the
//! server with `psql` inside the container and asserts on settings, logs and
//! expected-output fixtures.
//!
//! ## Suites
//!
//! * **auto-config ([`suites::autoconfig`]):** one container per memory/CPU scenario.
//! * **extensions ([`suites::extensions`]):** `CREATE EXTENSION` for every manifest entry
//!   in dependency order, retrying while the server is still starting.
//! * **regress ([`suites::regress`]):** `sql/*.sql` against `expected/*.out`.
//!
//! Every container is held by a [`pgpack_docker::ScopedContainer`], so a failing
//! assertion, an error or a cancelled suite future still removes it.

mod error;
pub mod expect;
pub mod psql;
pub mod report;
pub mod scenario;
pub mod size;
pub mod suites;

pub use crate::error::{HarnessError, HarnessErrorExt};
pub use crate::expect::{Expectation, Outcome};
pub use crate::report::Report;
pub use crate::size::parse_pg_size;
pub use crate::suites::{SuiteContext, Target};
