//! Per-service circuit breakers.
//!
//! State is process-local: each instance of the service maintains its
//! own breakers, which multiplies the effective threshold when scaling
//! horizontally. DESIGN.md records the tradeoff.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use compact_str::CompactString;
use tokio::time::Instant;

use crate::error::FlowError;

/// Observable state of one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

/// Tuning for a breaker.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// How long the breaker stays open before admitting a probe.
    pub open_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// State machine guarding calls to one named external dependency.
pub struct CircuitBreaker {
    name: CompactString,
    settings: BreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<CompactString>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Run `operation` under the breaker.
    ///
    /// While open and inside the timeout window this fails fast with a
    /// service-unavailable error without invoking the operation. Once
    /// the timeout elapses, exactly one probe is admitted; its success
    /// closes the breaker and resets the failure count, its failure
    /// re-opens the breaker and restarts the timeout.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, FlowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FlowError>>,
    {
        self.admit()?;
        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Result<(), FlowError> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let timed_out = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.settings.open_timeout);
                if timed_out {
                    tracing::info!(breaker = %self.name, "Circuit breaker half-open, probing");
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(())
                } else {
                    Err(FlowError::service_unavailable(&self.name))
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(FlowError::service_unavailable(&self.name))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state != BreakerState::Closed {
            tracing::info!(breaker = %self.name, "Circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.probe_in_flight = false;
        match inner.state {
            BreakerState::HalfOpen => {
                tracing::warn!(breaker = %self.name, "Probe failed, circuit breaker re-opened");
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
            }
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.settings.failure_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        "Failure threshold reached, circuit breaker opened"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// Registry of breakers keyed by service name.
///
/// Owned by the application state and threaded through constructors, so
/// tests get isolated instances instead of sharing module-level statics.
pub struct BreakerRegistry {
    defaults: BreakerSettings,
    breakers: RwLock<HashMap<CompactString, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(defaults: BreakerSettings) -> Self {
        Self {
            defaults,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        {
            let breakers = self
                .breakers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(breaker) = breakers.get(name) {
                return breaker.clone();
            }
        }
        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(CompactString::from(name))
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.defaults.clone())))
            .clone()
    }

    /// Current state of every registered breaker.
    pub fn snapshot(&self) -> Vec<(CompactString, BreakerState)> {
        let breakers = self
            .breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.state()))
            .collect()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker(threshold: u32, timeout_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test-service",
            BreakerSettings {
                failure_threshold: threshold,
                open_timeout: Duration::from_millis(timeout_ms),
            },
        )
    }

    async fn failing_call(breaker: &CircuitBreaker, invocations: &AtomicU32) -> FlowError {
        breaker
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(FlowError::network("refused"))
            })
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn opens_after_threshold_and_fails_fast() {
        let breaker = breaker(2, 60_000);
        let invocations = AtomicU32::new(0);

        failing_call(&breaker, &invocations).await;
        assert_eq!(breaker.state(), BreakerState::Closed);
        failing_call(&breaker, &invocations).await;
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(invocations.load(Ordering::SeqCst), 2);

        // Third call is rejected without invoking the operation.
        let err = failing_call(&breaker, &invocations).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
        assert!(err.message.contains("temporarily unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_probe_closes_and_resets() {
        let breaker = breaker(1, 1000);
        let invocations = AtomicU32::new(0);

        failing_call(&breaker, &invocations).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_millis(1001)).await;

        let result = breaker
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FlowError>("recovered")
            })
            .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(invocations.load(Ordering::SeqCst), 2);

        // Failure count was reset: one new failure does not trip a
        // threshold-1 breaker twice over.
        failing_call(&breaker, &invocations).await;
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens_and_restarts_the_timeout() {
        let breaker = breaker(1, 1000);
        let invocations = AtomicU32::new(0);

        failing_call(&breaker, &invocations).await;
        tokio::time::advance(Duration::from_millis(1001)).await;

        // Probe fails: back to open.
        failing_call(&breaker, &invocations).await;
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(invocations.load(Ordering::SeqCst), 2);

        // Timeout restarted: still failing fast before it elapses again.
        tokio::time::advance(Duration::from_millis(500)).await;
        failing_call(&breaker, &invocations).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn registry_hands_out_one_breaker_per_name() {
        let registry = BreakerRegistry::default();
        let a = registry.get_or_create("workflow-engine");
        let b = registry.get_or_create("workflow-engine");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
