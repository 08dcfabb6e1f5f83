//! Central error reporting.
//!
//! Every handled error is persisted to `error_logs`; critical severity
//! additionally pushes an immediate system-alert notification to the
//! owning tenant. The reporter's own failures are logged and swallowed —
//! reporting must never take the pipeline down with it.

use std::sync::Arc;
use uuid::Uuid;

use crate::collaborators::Notifier;
use crate::error::{FlowError, Severity};
use crate::stores::{ErrorLogStore, NewErrorLog};
use crewflow_sdk::objects::{NotificationKind, NotificationRequest};

#[derive(Clone)]
pub struct ErrorReporter {
    errors: Arc<dyn ErrorLogStore>,
    notifier: Arc<dyn Notifier>,
}

impl ErrorReporter {
    pub fn new(errors: Arc<dyn ErrorLogStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { errors, notifier }
    }

    pub async fn report(
        &self,
        tenant_id: Option<Uuid>,
        component: &str,
        operation: &str,
        error: &FlowError,
        context: serde_json::Value,
    ) {
        tracing::error!(
            component,
            operation,
            kind = error.kind.as_str(),
            severity = %error.severity,
            error = %error,
            "Handled error"
        );

        let entry = NewErrorLog {
            tenant_id,
            component: component.into(),
            operation: operation.into(),
            kind: error.kind,
            severity: error.severity,
            message: error.message.clone(),
            context,
            retry_count: 0,
        };
        if let Err(store_err) = self.errors.record(entry).await {
            tracing::error!(error = %store_err, "Failed to persist error log");
        }

        if error.severity == Severity::Critical {
            let Some(tenant_id) = tenant_id else {
                return;
            };
            let request = NotificationRequest {
                tenant_id,
                kind: NotificationKind::SystemAlert,
                title: format!("Critical error in {component}"),
                body: error.to_string(),
                options: serde_json::json!({ "operation": operation }),
            };
            if let Err(notify_err) = self.notifier.create_notification(request).await {
                tracing::error!(error = %notify_err, "Failed to emit critical-error notification");
            }
        }
    }
}
