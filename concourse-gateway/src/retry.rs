use std::future::Future;
use std::time::Duration;

use concourse_core::{GatewayError, GatewayResult};

/// Bounded exponential backoff for downstream calls.
///
/// Only `DownstreamUnavailable` is retried: GET-class calls are safe to
/// repeat, and POST-class calls carry the same idempotency key on every
/// attempt. Semantic errors surface immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the retry following `attempt` (1-based), doubling each
    /// time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    pub async fn run<T, F, Fut>(&self, op: &str, mut call: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "downstream call failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retriable() {
                        tracing::error!(op, attempt, "retries exhausted: {}", err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn retries_unavailable_until_bound() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result: GatewayResult<()> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::DownstreamUnavailable("down".to_string())) }
            })
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::DownstreamUnavailable(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(GatewayError::DownstreamUnavailable("blip".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn semantic_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);

        let result: GatewayResult<()> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::DownstreamRejected("bad data".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::DownstreamRejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
