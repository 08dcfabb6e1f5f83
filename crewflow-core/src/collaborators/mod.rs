//! Collaborator services the pipeline calls out to.
//!
//! Each collaborator is a trait so tests can substitute recording
//! doubles; the HTTP implementations wrap their calls in retry and a
//! per-service circuit breaker.

mod http;

pub use http::{HttpMonitoringService, HttpNotifier, HttpWorkflowEngine};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::FlowError;
use crewflow_sdk::objects::{NotificationRequest, WorkflowRunResponse};

/// Breaker name guarding workflow-engine calls.
pub const WORKFLOW_ENGINE_SERVICE: &str = "workflow-engine";
/// Breaker name guarding monitoring-sweep calls.
pub const MONITORING_SERVICE: &str = "monitoring";

#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Start the named business workflow. The workflow itself may run
    /// arbitrarily long; only the returned instance id is recorded.
    async fn execute_workflow(
        &self,
        name: &str,
        payload: &serde_json::Value,
        tenant_id: Uuid,
    ) -> Result<WorkflowRunResponse, FlowError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn create_notification(&self, request: NotificationRequest) -> Result<(), FlowError>;
}

#[async_trait]
pub trait MonitoringService: Send + Sync {
    /// Run one monitoring sweep over a tenant's stores.
    async fn run_monitoring(&self, tenant_id: Uuid) -> Result<(), FlowError>;
}
