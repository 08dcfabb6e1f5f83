//! Admin API handlers.
//!
//! These endpoints are called by the operations dashboard and require
//! the `X-CrewFlow-Admin-Authorization` header with the admin secret.
//!
//! # Endpoints
//!
//! - `GET  /events`                 – list events (paginated, filterable by status)
//! - `GET  /events/{event_id}`      – fetch one event
//! - `POST /events/{event_id}/replay` – re-run handlers for a failed event
//! - `GET  /errors`                 – list unresolved error logs
//! - `POST /errors/{error_id}/resolve` – mark an error log resolved
//! - `GET  /subscriptions`          – list subscriptions
//! - `POST /subscriptions`          – register (or re-enable) a subscription

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod get_event;
mod list_error_logs;
mod list_events;
mod list_subscriptions;
mod register_subscription;
mod replay_event;
mod resolve_error_log;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events::list_events))
        .route("/events/{event_id}", get(get_event::get_event))
        .route(
            "/events/{event_id}/replay",
            post(replay_event::replay_event),
        )
        .route("/errors", get(list_error_logs::list_error_logs))
        .route(
            "/errors/{error_id}/resolve",
            post(resolve_error_log::resolve_error_log),
        )
        .route(
            "/subscriptions",
            get(list_subscriptions::list_subscriptions)
                .post(register_subscription::register_subscription),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Database(sqlx::Error),
    NotFound,
    NotReplayable(&'static str),
    UnknownTopic(String),
    InvalidQuery(String),
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Database(e) => {
                tracing::error!(error = %e, "Admin API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "resource not found").into_response()
            }
            AdminApiError::NotReplayable(reason) => {
                (StatusCode::CONFLICT, reason).into_response()
            }
            AdminApiError::UnknownTopic(topic) => (
                StatusCode::BAD_REQUEST,
                format!("unknown topic: {topic}"),
            )
                .into_response(),
            AdminApiError::InvalidQuery(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

use crewflow_core::entities::EventStatus;
use crewflow_core::entities::error_logs::ErrorLogRecord;
use crewflow_core::entities::webhook_events::WebhookEventRecord;
use crewflow_core::entities::webhook_subscriptions::SubscriptionRecord;
use crewflow_sdk::objects::admin::{
    AdminErrorLogResponse, AdminEventResponse, AdminSubscriptionResponse,
};

pub(crate) fn event_to_admin_response(r: &WebhookEventRecord) -> AdminEventResponse {
    AdminEventResponse {
        id: r.id,
        tenant_id: r.tenant_id,
        store_domain: r.store_domain.clone(),
        topic: r.topic.clone(),
        provider_event_id: r.provider_event_id.clone(),
        status: r.status.as_str().to_owned(),
        received_at: r.received_at.unix_timestamp(),
        processing_ms: r.processing_ms,
        error_text: r.error_text.clone(),
        triggered_workflows: r.triggered_workflows.clone(),
        triggered_actions: r.triggered_actions.clone(),
    }
}

pub(crate) fn subscription_to_admin_response(r: &SubscriptionRecord) -> AdminSubscriptionResponse {
    AdminSubscriptionResponse {
        id: r.id,
        tenant_id: r.tenant_id,
        store_domain: r.store_domain.clone(),
        topic: r.topic.clone(),
        address: r.address.clone(),
        enabled: r.enabled,
        created_at: r.created_at.unix_timestamp(),
        last_triggered_at: r.last_triggered_at.map(|t| t.unix_timestamp()),
        trigger_count: r.trigger_count,
    }
}

pub(crate) fn error_log_to_admin_response(r: &ErrorLogRecord) -> AdminErrorLogResponse {
    AdminErrorLogResponse {
        id: r.id,
        tenant_id: r.tenant_id,
        component: r.component.clone(),
        operation: r.operation.clone(),
        error_kind: r.error_kind.clone(),
        severity: r.severity.as_str().to_owned(),
        message: r.message.clone(),
        created_at: r.created_at.unix_timestamp(),
        resolved: r.resolved,
        retry_count: r.retry_count,
    }
}

/// Parse a `?status=` query value.
pub(crate) fn parse_status(value: &str) -> Option<EventStatus> {
    match value {
        "pending" => Some(EventStatus::Pending),
        "processed" => Some(EventStatus::Processed),
        "failed" => Some(EventStatus::Failed),
        "ignored" => Some(EventStatus::Ignored),
        _ => None,
    }
}
