//! Response and request objects for the admin API.
//!
//! Timestamps are unix seconds; the database models in `crewflow-core`
//! are the source of truth and are converted at the handler boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminEventResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub provider_event_id: Option<String>,
    pub status: String,
    pub received_at: i64,
    pub processing_ms: Option<i64>,
    pub error_text: Option<String>,
    pub triggered_workflows: Vec<String>,
    pub triggered_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSubscriptionResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub address: String,
    pub enabled: bool,
    pub created_at: i64,
    pub last_triggered_at: Option<i64>,
    pub trigger_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminErrorLogResponse {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub component: String,
    pub operation: String,
    pub error_kind: String,
    pub severity: String,
    pub message: String,
    pub created_at: i64,
    pub resolved: bool,
    pub retry_count: i32,
}

/// Body for registering (or re-enabling) a store's topic subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSubscriptionRequest {
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}
