use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::admin::{AdminApiError, event_to_admin_response};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::webhook_events::GetEventById;
use crewflow_core::framework::DatabaseProcessor;

/// `GET /admin/events/{event_id}` — fetch one event.
pub(crate) async fn get_event(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor::new(state.db.clone());
    let event = processor
        .process(GetEventById { id: event_id })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or(AdminApiError::NotFound)?;

    Ok(Json(event_to_admin_response(&event)))
}
