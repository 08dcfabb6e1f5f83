//! Objects exchanged with the workflow engine and monitoring services.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to start a named business workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub name: CompactString,
    pub tenant_id: Uuid,
    pub payload: serde_json::Value,
}

/// The engine's reply. `workflow_id` is absent when the engine accepted
/// the trigger but did not materialize an instance (e.g. a no-op guard).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunResponse {
    #[serde(default)]
    pub workflow_id: Option<String>,
}

/// Request for a monitoring sweep over one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRequest {
    pub tenant_id: Uuid,
}
