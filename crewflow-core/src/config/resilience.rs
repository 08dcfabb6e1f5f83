//! Retry and circuit-breaker tuning shared by the collaborator clients.

use crate::resilience::breaker::BreakerSettings;
use crate::resilience::retry::RetryPolicy;

#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    pub retry: RetryPolicy,
    pub breaker: BreakerSettings,
}
