use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule for connection attempts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// How many times to retry after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,

    /// Ceiling for the growing delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,

    /// Randomize each delay so restarting replicas don't reconnect in
    /// lockstep.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    fn delay_for(&self, failed_attempts: u32) -> u64 {
        let mut delay = self.initial_delay_ms as f64;
        for _ in 1..failed_attempts {
            delay *= self.backoff_multiplier;
        }
        let delay = (delay as u64).min(self.max_delay_ms);
        if self.use_jitter {
            jittered(delay)
        } else {
            delay
        }
    }
}

/// Run `operation` until it succeeds or the retry budget is spent.
/// The error from the final attempt is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut failed: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if failed > 0 {
                    debug!(retries = failed, "Connection attempt succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if failed >= config.max_retries => {
                warn!(
                    attempts = failed + 1,
                    error = %e,
                    "Giving up after exhausting retries"
                );
                return Err(e);
            }
            Err(e) => {
                failed += 1;
                let wait_ms = config.delay_for(failed);
                debug!(
                    attempt = failed,
                    max_retries = config.max_retries,
                    wait_ms,
                    error = %e,
                    "Connection attempt failed, will retry"
                );
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        }
    }
}

/// [`retry_with_backoff`] with the default schedule.
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff(operation, RetryConfig::default()).await
}

/// Scale the delay by a pseudo-random factor in [0.5, 1.0]. Hashing the
/// current time is enough entropy here; this is not cryptographic.
fn jittered(delay_ms: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let bucket = RandomState::new().hash_one(std::time::SystemTime::now()) % 50;
    let factor = 0.5 + bucket as f64 / 100.0;
    (delay_ms as f64 * factor) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let c = Arc::new(AtomicU32::new(0));
        (c.clone(), c)
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let (calls, seen) = counter();

        let result: Result<u32, String> = retry(|| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (calls, seen) = counter();
        let config = RetryConfig::new().with_initial_delay(1).without_jitter();

        let result: Result<u32, String> = retry_with_backoff(
            || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            config,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let (calls, seen) = counter();
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_initial_delay(1)
            .without_jitter();

        let result: Result<u32, String> = retry_with_backoff(
            || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
            config,
        )
        .await;

        assert_eq!(result.unwrap_err(), "down");
        // Initial attempt plus two retries.
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 500,
            backoff_multiplier: 2.0,
            use_jitter: false,
        };
        assert_eq!(config.delay_for(1), 100);
        assert_eq!(config.delay_for(2), 200);
        assert_eq!(config.delay_for(3), 400);
        assert_eq!(config.delay_for(4), 500);
    }
}
