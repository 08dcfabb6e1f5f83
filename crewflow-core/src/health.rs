//! Aggregated system health.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::resilience::breaker::{BreakerRegistry, BreakerState};
use crate::stores::{CacheStore, EventStore};

const CACHE_PROBE_KEY: &str = "health:cache_probe";
const CACHE_PROBE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub healthy: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<ComponentHealth>,
}

/// Polls storage, the breaker registry, and the cache on demand.
pub struct HealthChecker {
    events: Arc<dyn EventStore>,
    cache: Arc<dyn CacheStore>,
    breakers: Arc<BreakerRegistry>,
}

impl HealthChecker {
    pub fn new(
        events: Arc<dyn EventStore>,
        cache: Arc<dyn CacheStore>,
        breakers: Arc<BreakerRegistry>,
    ) -> Self {
        Self {
            events,
            cache,
            breakers,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let mut checks = Vec::with_capacity(4);

        checks.push(match self.events.probe().await {
            Ok(()) => ComponentHealth {
                name: "storage",
                healthy: true,
                detail: "reachable".to_owned(),
            },
            Err(err) => ComponentHealth {
                name: "storage",
                healthy: false,
                detail: err.to_string(),
            },
        });

        let open: Vec<String> = self
            .breakers
            .snapshot()
            .into_iter()
            .filter(|(_, state)| *state == BreakerState::Open)
            .map(|(name, _)| name.into())
            .collect();
        checks.push(if open.is_empty() {
            ComponentHealth {
                name: "circuit_breakers",
                healthy: true,
                detail: "all closed".to_owned(),
            }
        } else {
            ComponentHealth {
                name: "circuit_breakers",
                healthy: false,
                detail: format!("open: {}", open.join(", ")),
            }
        });

        checks.push(self.cache_roundtrip().await);

        // No cheap probe exists for the notification service; reported
        // healthy until one does.
        checks.push(ComponentHealth {
            name: "notifications",
            healthy: true,
            detail: "assumed healthy".to_owned(),
        });

        let healthy = checks.iter().filter(|c| c.healthy).count();
        let status = if healthy == checks.len() {
            HealthStatus::Healthy
        } else if healthy * 2 >= checks.len() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, checks }
    }

    async fn cache_roundtrip(&self) -> ComponentHealth {
        let nonce = serde_json::Value::String(Uuid::new_v4().to_string());
        let ok = match self
            .cache
            .put(CACHE_PROBE_KEY, nonce.clone(), Some(CACHE_PROBE_TTL))
            .await
        {
            Ok(()) => matches!(
                self.cache.get_fresh(CACHE_PROBE_KEY).await,
                Ok(Some(read)) if read == nonce
            ),
            Err(_) => false,
        };
        ComponentHealth {
            name: "cache",
            healthy: ok,
            detail: if ok {
                "round-trip ok".to_owned()
            } else {
                "round-trip failed".to_owned()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::resilience::breaker::BreakerSettings;
    use crate::stores::{InsertOutcome, MemoryStore, NewEvent};
    use async_trait::async_trait;

    struct DownEventStore;

    #[async_trait]
    impl EventStore for DownEventStore {
        async fn insert_pending(&self, _: NewEvent) -> Result<InsertOutcome, FlowError> {
            Err(FlowError::storage("connection refused"))
        }
        async fn mark_processed(
            &self,
            _: Uuid,
            _: i64,
            _: Vec<String>,
            _: Vec<String>,
        ) -> Result<(), FlowError> {
            Err(FlowError::storage("connection refused"))
        }
        async fn mark_failed(&self, _: Uuid, _: i64, _: &str) -> Result<(), FlowError> {
            Err(FlowError::storage("connection refused"))
        }
        async fn mark_ignored(&self, _: Uuid, _: &str) -> Result<(), FlowError> {
            Err(FlowError::storage("connection refused"))
        }
        async fn probe(&self) -> Result<(), FlowError> {
            Err(FlowError::storage("connection refused"))
        }
    }

    #[tokio::test]
    async fn all_checks_passing_is_healthy() {
        let store = Arc::new(MemoryStore::new());
        let checker = HealthChecker::new(
            store.clone(),
            store,
            Arc::new(BreakerRegistry::default()),
        );
        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 4);
    }

    #[tokio::test]
    async fn an_open_breaker_degrades_the_system() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(BreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        }));
        let breaker = registry.get_or_create("workflow-engine");
        let _ = breaker
            .call(|| async { Err::<(), _>(FlowError::network("down")) })
            .await;

        let checker = HealthChecker::new(store.clone(), store, registry);
        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        let breaker_check = report
            .checks
            .iter()
            .find(|c| c.name == "circuit_breakers")
            .unwrap();
        assert!(!breaker_check.healthy);
        assert!(breaker_check.detail.contains("workflow-engine"));
    }

    #[tokio::test]
    async fn half_healthy_is_still_degraded() {
        let cache = Arc::new(MemoryStore::new());
        let registry = Arc::new(BreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        }));
        let breaker = registry.get_or_create("monitoring");
        let _ = breaker
            .call(|| async { Err::<(), _>(FlowError::network("down")) })
            .await;

        let checker = HealthChecker::new(Arc::new(DownEventStore), cache, registry);
        let report = checker.check().await;
        // 2 of 4 healthy: exactly half, degraded not unhealthy.
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    struct DownCacheStore;

    #[async_trait]
    impl CacheStore for DownCacheStore {
        async fn put(
            &self,
            _: &str,
            _: serde_json::Value,
            _: Option<Duration>,
        ) -> Result<(), FlowError> {
            Err(FlowError::storage("cache down"))
        }
        async fn get_fresh(&self, _: &str) -> Result<Option<serde_json::Value>, FlowError> {
            Err(FlowError::storage("cache down"))
        }
    }

    #[tokio::test]
    async fn mostly_failing_checks_are_unhealthy() {
        let registry = Arc::new(BreakerRegistry::new(BreakerSettings {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        }));
        let breaker = registry.get_or_create("monitoring");
        let _ = breaker
            .call(|| async { Err::<(), _>(FlowError::network("down")) })
            .await;

        let checker =
            HealthChecker::new(Arc::new(DownEventStore), Arc::new(DownCacheStore), registry);
        let report = checker.check().await;
        // Only the notification stub passes: 1 of 4.
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }
}
