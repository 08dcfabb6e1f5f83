//! Bounded exponential-backoff retry with jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::FlowError;

/// Backoff parameters for [`with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Random jitter added on top of each backoff delay, spreading out
    /// synchronized retry storms against a flaky dependency.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2,
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Deterministic portion of the delay after a failed `attempt`
    /// (0-based): `min(base * multiplier^attempt, max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let factor = u64::from(self.multiplier).saturating_pow(attempt);
        Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
    }

    fn jitter(&self) -> Duration {
        let cap_ms = self.max_jitter.as_millis() as u64;
        if cap_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::random_range(0..=cap_ms))
        }
    }
}

/// Run `operation`, retrying transient failures per `policy`.
///
/// Non-retryable errors and exhausted budgets re-throw the last error
/// unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, FlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FlowError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !err.is_retryable() {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt) + policy.jitter();
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(8),
            multiplier: 2,
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = RetryPolicy::default();
        for attempt in 0..64 {
            assert!(policy.delay_for_attempt(attempt) <= policy.max_delay);
        }
        // 1000 * 2^5 = 32000 > 30000.
        assert_eq!(policy.delay_for_attempt(5), policy.max_delay);
    }

    #[test]
    fn delay_is_monotonically_non_decreasing() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..policy.max_retries {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn default_delays_follow_the_doubling_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result = with_retry(&fast_policy(), "test_op", move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(FlowError::network("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        // Two failures, two sleeps, success on the third call.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = with_retry(&fast_policy(), "test_op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FlowError::validation("bad payload"))
            }
        })
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_the_retry_budget_then_rethrows() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = with_retry(&fast_policy(), "test_op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FlowError::timeout("deadline exceeded"))
            }
        })
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Timeout);
        // Initial attempt + max_retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
