//! Resilience primitives guarding outbound collaborator calls.
//!
//! Composition order at the call sites is retry-around-breaker: an open
//! breaker fails fast with a non-retryable error, so the retry loop
//! stops immediately instead of hammering a dependency that is already
//! shedding load.

pub mod breaker;
pub mod fallback;
pub mod retry;

pub use breaker::{BreakerRegistry, BreakerSettings, BreakerState, CircuitBreaker};
pub use fallback::{with_cached_fallback, with_fallback};
pub use retry::{RetryPolicy, with_retry};
