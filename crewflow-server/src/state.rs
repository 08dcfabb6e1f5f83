//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use crewflow_core::health::HealthChecker;
use crewflow_core::pipeline::WebhookProcessor;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// Cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by the admin handlers.
    pub db: PgPool,
    /// Runtime configuration (reloadable via SIGHUP).
    pub config: SharedConfig,
    /// The webhook ingestion pipeline.
    pub processor: Arc<WebhookProcessor>,
    /// On-demand health aggregation.
    pub health: Arc<HealthChecker>,
}
