//! Bounded retry with exponential backoff for transient storage errors.
//!
//! Only failures classified by `Error::is_transient` (network, timeout,
//! I/O) are retried. Each attempt runs under its own deadline so a hung
//! backend call surfaces as `Error::Timeout` instead of stalling an upload.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use resumevault_common::{Error, Result};

/// How a storage call is retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the exponential wait.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Spread each wait by +/- 25%.
    pub jitter: bool,
    /// Deadline for a single attempt. `None` waits indefinitely.
    pub attempt_timeout: Option<Duration>,
}

impl RetryConfig {
    /// Up to `max_retries` retries, 200 ms doubling to 5 s, 30 s per attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_initial_delay(self, initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..self
        }
    }

    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Self { max_delay, ..self }
    }

    pub fn with_backoff_multiplier(self, backoff_multiplier: f64) -> Self {
        Self {
            backoff_multiplier,
            ..self
        }
    }

    pub fn with_jitter(self, jitter: bool) -> Self {
        Self { jitter, ..self }
    }

    pub fn with_attempt_timeout(self, attempt_timeout: Option<Duration>) -> Self {
        Self {
            attempt_timeout,
            ..self
        }
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let grown = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = grown.min(self.max_delay.as_millis() as f64);

        let spread = if self.jitter {
            rand::random_range(0.75..=1.25)
        } else {
            1.0
        };

        Duration::from_millis((capped * spread) as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Await `future`, failing with `Error::Timeout` once `limit` passes.
pub async fn with_timeout<Fut, T>(limit: Option<Duration>, what: &str, future: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let Some(limit) = limit else {
        return future.await;
    };

    match tokio::time::timeout(limit, future).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::Timeout(format!("{} exceeded {:?}", what, limit))),
    }
}

/// Runs storage calls under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Call `operation` until it succeeds, fails permanently, or runs out
    /// of retries. `what` names the call in logs and timeout errors.
    pub async fn execute<F, Fut, T>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;

        loop {
            let err = match with_timeout(self.config.attempt_timeout, what, operation()).await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(operation = what, retries, "Recovered after retrying");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            if retries >= self.config.max_retries {
                warn!(operation = what, attempts = retries + 1, error = %err, "Retries exhausted");
                return Err(err);
            }

            let wait = self.config.backoff(retries);
            retries += 1;
            warn!(operation = what, retry = retries, wait_ms = wait.as_millis() as u64, error = %err, "Transient failure, retrying");
            tokio::time::sleep(wait).await;
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick(max_retries: u32) -> RetryExecutor {
        RetryExecutor::new(
            RetryConfig::new(max_retries)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    /// Run `executor` against an operation that fails with `fail` for the
    /// first `failures` calls. Returns the outcome and the number of calls.
    async fn run_failing(
        executor: &RetryExecutor,
        failures: u32,
        fail: fn() -> Error,
    ) -> (Result<u32>, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = executor
            .execute("put", move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        Err(fail())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        (outcome, calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_backoff_doubles() {
        let config = RetryConfig::new(3)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(60))
            .with_jitter(false);

        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3))
            .with_backoff_multiplier(10.0)
            .with_jitter(false);

        assert_eq!(config.backoff(4), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let config = RetryConfig::new(1).with_initial_delay(Duration::from_millis(1000));
        for _ in 0..50 {
            let wait = config.backoff(0).as_millis();
            assert!((750..=1250).contains(&wait), "{} ms", wait);
        }
    }

    #[tokio::test]
    async fn test_network_errors_are_retried() {
        let (outcome, calls) =
            run_failing(&quick(3), 2, || Error::Network("reset".to_string())).await;

        assert_eq!(outcome.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let (outcome, calls) =
            run_failing(&quick(3), u32::MAX, || Error::Storage("bucket missing".to_string())).await;

        assert!(matches!(outcome, Err(Error::Storage(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (outcome, calls) =
            run_failing(&quick(2), u32::MAX, || Error::Network("down".to_string())).await;

        assert!(matches!(outcome, Err(Error::Network(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_hung_attempt_times_out_and_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let executor = RetryExecutor::new(
            RetryConfig::new(1)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false)
                .with_attempt_timeout(Some(Duration::from_millis(10))),
        );

        let outcome: Result<()> = executor
            .execute("put", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(outcome, Err(Error::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_deadline_future_runs_to_completion() {
        let value = with_timeout(None, "noop", async { Ok::<_, Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
