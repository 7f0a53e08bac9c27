//! Exponential backoff for operations that fail transiently while a server starts.

use pgpack_domain::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Doubling backoff with a ceiling on both delay and attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts.max(1),
            base: Duration::from_millis(cfg.base_delay_ms),
            max: Duration::from_millis(cfg.max_delay_ms.max(cfg.base_delay_ms)),
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).map_or(self.max, |d| d.min(self.max))
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the attempt
    /// ceiling is reached. The last error is returned.
    ///
    /// # Errors
    /// Returns the error of the final attempt.
    pub async fn retry<T, E, F, Fut>(
        &self,
        label: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts && is_transient(&err) => {
                    let delay = self.delay(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn backoff(attempts: u32) -> Backoff {
        Backoff { attempts, base: Duration::from_millis(100), max: Duration::from_millis(500) }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let b = backoff(5);
        assert_eq!(b.delay(1), Duration::from_millis(100));
        assert_eq!(b.delay(2), Duration::from_millis(200));
        assert_eq!(b.delay(3), Duration::from_millis(400));
        assert_eq!(b.delay(4), Duration::from_millis(500));
        assert_eq!(b.delay(64), Duration::from_millis(500));
    }

    #[test]
    fn config_never_yields_zero_attempts() {
        let cfg = RetryConfig { attempts: 0, base_delay_ms: 10, max_delay_ms: 1 };
        let b = Backoff::from(&cfg);
        assert_eq!(b.attempts, 1);
        assert_eq!(b.max, Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = Cell::new(0);
        let result = backoff(5)
            .retry(
                "create extension",
                |e: &String| e.contains("starting up"),
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 { Err("the database system is starting up".to_owned()) } else { Ok(n) }
                    }
                },
            )
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_attempt_ceiling() {
        let calls = Cell::new(0);
        let result: Result<(), String> = backoff(3)
            .retry(
                "connect",
                |_: &String| true,
                || {
                    calls.set(calls.get() + 1);
                    async { Err("connection refused".to_owned()) }
                },
            )
            .await;

        assert_eq!(result, Err("connection refused".to_owned()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_fail_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), String> = backoff(5)
            .retry(
                "create extension",
                |e: &String| e.contains("refused"),
                || {
                    calls.set(calls.get() + 1);
                    async { Err("extension \"nope\" is not available".to_owned()) }
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
