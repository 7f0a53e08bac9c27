//! # Runtime
//!
//! Standardized [Tokio](https://tokio.rs) runtime construction for the workspace binaries.
//!
//! ## Profiles
//! * **Default**: multi-threaded scheduler sized from available parallelism.
//! * **Memory Efficient**: half the workers, smaller stacks. Used by the test harness,
//!   which mostly waits on `docker` subprocesses.
//! * **Current Thread**: single-threaded scheduler for short-lived helpers such as the
//!   container entrypoint.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[pgpack_runtime::main(current_thread)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use pgpack_derive::main;

use anyhow::anyhow;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The number of worker threads used when detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
/// Upper bound on worker threads accepted from configuration.
const MAX_WORKER_THREADS: usize = 256;
/// Default stack size (2 `MiB`).
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
const MIN_STACK_SIZE: usize = 512 * 1024;
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
const THREAD_KEEP_ALIVE: Duration = Duration::from_secs(30);

static WORKER_THREADS: OnceLock<usize> = OnceLock::new();

/// Worker count from `TOKIO_WORKER_THREADS` or the hardware, resolved once per process.
fn detected_worker_threads() -> usize {
    *WORKER_THREADS.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| (1..=MAX_WORKER_THREADS).contains(&n))
            .unwrap_or_else(|| {
                available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Scheduler flavor of a runtime profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    MultiThread,
    CurrentThread,
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub flavor: Flavor,
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::MultiThread,
            worker_threads: detected_worker_threads(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "pgpack-worker".to_owned(),
            thread_keep_alive: THREAD_KEEP_ALIVE,
        }
    }
}

impl RuntimeConfig {
    /// Preset for I/O bound tooling where memory footprint matters more than throughput.
    #[must_use]
    pub fn memory_efficient() -> Self {
        Self {
            worker_threads: (detected_worker_threads() / 2).max(1),
            stack_size: MIN_STACK_SIZE * 2,
            thread_name: "pgpack-io".to_owned(),
            ..Self::default()
        }
    }

    /// Preset for single-shot helpers: no worker pool at all.
    #[must_use]
    pub fn current_thread() -> Self {
        Self { flavor: Flavor::CurrentThread, worker_threads: 1, ..Self::default() }
    }

    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, MAX_WORKER_THREADS);
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.thread_name = name;
        }
        self
    }
}

/// Builds a Tokio runtime from `config` with all drivers (I/O, time, signals) enabled.
///
/// Out-of-range values are clamped rather than rejected.
///
/// # Errors
/// Returns an error if the OS refuses to create the runtime threads.
pub fn build_runtime(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config
        .clone()
        .with_worker_threads(config.worker_threads)
        .with_stack_size(config.stack_size);
    debug!(config = ?config, "Building tokio runtime");

    let mut builder = match config.flavor {
        Flavor::CurrentThread => Builder::new_current_thread(),
        Flavor::MultiThread => {
            let mut builder = Builder::new_multi_thread();
            builder
                .worker_threads(config.worker_threads)
                .thread_stack_size(config.stack_size)
                .thread_keep_alive(config.thread_keep_alive);
            builder
        },
    };

    builder
        .thread_name(&config.thread_name)
        .enable_all()
        .build()
        .map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_threads_are_clamped() {
        assert_eq!(RuntimeConfig::default().with_worker_threads(0).worker_threads, 1);
        assert_eq!(
            RuntimeConfig::default().with_worker_threads(10_000).worker_threads,
            MAX_WORKER_THREADS
        );
    }

    #[test]
    fn stack_size_is_clamped() {
        assert_eq!(RuntimeConfig::default().with_stack_size(1).stack_size, MIN_STACK_SIZE);
        assert_eq!(RuntimeConfig::default().with_stack_size(usize::MAX).stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn blank_thread_name_is_ignored() {
        let config = RuntimeConfig::default().with_thread_name("   ");
        assert_eq!(config.thread_name, "pgpack-worker");
    }

    #[test]
    fn current_thread_runtime_runs_futures() {
        let rt = build_runtime(&RuntimeConfig::current_thread()).unwrap();
        let value = rt.block_on(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn memory_efficient_keeps_at_least_one_worker() {
        assert!(RuntimeConfig::memory_efficient().worker_threads >= 1);
    }
}
