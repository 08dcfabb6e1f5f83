use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use std::time::Instant;
use uuid::Uuid;

use crate::api::admin::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::EventStatus;
use crewflow_core::entities::webhook_events::{
    GetEventById, MarkEventFailed, MarkEventProcessed,
};
use crewflow_core::framework::DatabaseProcessor;
use crewflow_sdk::Topic;

/// `POST /admin/events/{event_id}/replay` — re-run the handlers for a
/// failed event.
///
/// Replay is the one deliberate exception to the `pending -> terminal`
/// status rule: it transitions `failed -> {processed|failed}` under
/// operator control.
pub(crate) async fn replay_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor::new(state.db.clone());
    let record = processor
        .process(GetEventById { id: event_id })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or(AdminApiError::NotFound)?;

    if record.status != EventStatus::Failed {
        return Err(AdminApiError::NotReplayable(
            "only failed events can be replayed",
        ));
    }
    let Some(topic) = Topic::parse(&record.topic) else {
        return Err(AdminApiError::NotReplayable(
            "event topic is not in the catalog",
        ));
    };

    let started = Instant::now();
    let result = state
        .processor
        .replay(
            record.id,
            record.tenant_id,
            topic,
            &record.store_domain,
            record.payload.clone(),
        )
        .await;
    let processing_ms = started.elapsed().as_millis() as i64;

    match result {
        Ok(outcome) => {
            processor
                .process(MarkEventProcessed {
                    id: record.id,
                    expected_status: EventStatus::Failed,
                    processing_ms,
                    triggered_workflows: outcome.workflows,
                    triggered_actions: outcome.actions,
                })
                .await
                .map_err(AdminApiError::Database)?;
            tracing::info!(event_id = %record.id, "Event replay succeeded");
            Ok(Json(serde_json::json!({ "replayed": true })))
        }
        Err(err) => {
            processor
                .process(MarkEventFailed {
                    id: record.id,
                    expected_status: EventStatus::Failed,
                    processing_ms,
                    error_text: err.to_string(),
                })
                .await
                .map_err(AdminApiError::Database)?;
            tracing::warn!(event_id = %record.id, error = %err, "Event replay failed");
            Ok(Json(serde_json::json!({
                "replayed": false,
                "error": err.to_string(),
            })))
        }
    }
}
