//! HTTP implementations of the collaborator traits.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::collaborators::{
    MONITORING_SERVICE, MonitoringService, Notifier, WORKFLOW_ENGINE_SERVICE, WorkflowEngine,
};
use crate::error::FlowError;
use crate::resilience::breaker::{BreakerRegistry, CircuitBreaker};
use crate::resilience::retry::{RetryPolicy, with_retry};
use crewflow_sdk::objects::{
    MonitoringRequest, NotificationRequest, WorkflowRequest, WorkflowRunResponse,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Workflow engine client: POSTs [`WorkflowRequest`] to the engine's
/// trigger endpoint, guarded by retry around a circuit breaker.
pub struct HttpWorkflowEngine {
    client: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl HttpWorkflowEngine {
    pub fn new(base_url: &Url, retry: RetryPolicy, breakers: &BreakerRegistry) -> Self {
        Self {
            client: http_client(),
            endpoint: join_endpoint(base_url, "workflows/execute"),
            retry,
            breaker: breakers.get_or_create(WORKFLOW_ENGINE_SERVICE),
        }
    }
}

#[async_trait]
impl WorkflowEngine for HttpWorkflowEngine {
    async fn execute_workflow(
        &self,
        name: &str,
        payload: &serde_json::Value,
        tenant_id: Uuid,
    ) -> Result<WorkflowRunResponse, FlowError> {
        let request = WorkflowRequest {
            name: name.into(),
            tenant_id,
            payload: payload.clone(),
        };
        with_retry(&self.retry, "execute_workflow", || {
            let request = request.clone();
            async move {
                self.breaker
                    .call(|| async {
                        let response = self
                            .client
                            .post(self.endpoint.clone())
                            .json(&request)
                            .send()
                            .await?
                            .error_for_status()?;
                        let run: WorkflowRunResponse = response.json().await?;
                        Ok(run)
                    })
                    .await
            }
        })
        .await
    }
}

/// Notification service client. Deliveries are retried but not
/// breaker-guarded: a notification outage must not fail fast the whole
/// pipeline's best-effort emits.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl HttpNotifier {
    pub fn new(base_url: &Url, retry: RetryPolicy) -> Self {
        Self {
            client: http_client(),
            endpoint: join_endpoint(base_url, "notifications"),
            retry,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn create_notification(&self, request: NotificationRequest) -> Result<(), FlowError> {
        with_retry(&self.retry, "create_notification", || {
            let request = request.clone();
            async move {
                self.client
                    .post(self.endpoint.clone())
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
        })
        .await
    }
}

/// Monitoring sweep client, guarded like the workflow engine.
pub struct HttpMonitoringService {
    client: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl HttpMonitoringService {
    pub fn new(base_url: &Url, retry: RetryPolicy, breakers: &BreakerRegistry) -> Self {
        Self {
            client: http_client(),
            endpoint: join_endpoint(base_url, "monitoring/run"),
            retry,
            breaker: breakers.get_or_create(MONITORING_SERVICE),
        }
    }
}

#[async_trait]
impl MonitoringService for HttpMonitoringService {
    async fn run_monitoring(&self, tenant_id: Uuid) -> Result<(), FlowError> {
        let request = MonitoringRequest { tenant_id };
        with_retry(&self.retry, "run_monitoring", || {
            let request = request.clone();
            async move {
                self.breaker
                    .call(|| async {
                        self.client
                            .post(self.endpoint.clone())
                            .json(&request)
                            .send()
                            .await?
                            .error_for_status()?;
                        Ok(())
                    })
                    .await
            }
        })
        .await
    }
}

fn join_endpoint(base_url: &Url, path: &str) -> Url {
    base_url.join(path).unwrap_or_else(|_| base_url.clone())
}
