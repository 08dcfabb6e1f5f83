use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use serde::Deserialize;

use crate::api::admin::{AdminApiError, event_to_admin_response, parse_status};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::webhook_events::ListEvents;
use crewflow_core::framework::DatabaseProcessor;

#[derive(Debug, Deserialize)]
pub(crate) struct ListEventsQuery {
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// `GET /admin/events` — list events newest-first.
pub(crate) async fn list_events(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let status = match &query.status {
        Some(value) => Some(parse_status(value).ok_or_else(|| {
            AdminApiError::InvalidQuery(format!("unknown status filter: {value}"))
        })?),
        None => None,
    };

    let processor = DatabaseProcessor::new(state.db.clone());
    let events = processor
        .process(ListEvents {
            status,
            limit: query.limit.clamp(1, 500),
            offset: query.offset.max(0),
        })
        .await
        .map_err(AdminApiError::Database)?;

    let items: Vec<_> = events.iter().map(event_to_admin_response).collect();
    Ok(Json(items))
}
