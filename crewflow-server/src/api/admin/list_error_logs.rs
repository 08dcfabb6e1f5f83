use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use serde::Deserialize;

use crate::api::admin::{AdminApiError, error_log_to_admin_response};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::error_logs::ListUnresolvedErrorLogs;
use crewflow_core::framework::DatabaseProcessor;

#[derive(Debug, Deserialize)]
pub(crate) struct ListErrorLogsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// `GET /admin/errors` — unresolved error logs, newest-first.
pub(crate) async fn list_error_logs(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListErrorLogsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor::new(state.db.clone());
    let logs = processor
        .process(ListUnresolvedErrorLogs {
            limit: query.limit.clamp(1, 500),
        })
        .await
        .map_err(AdminApiError::Database)?;

    let items: Vec<_> = logs.iter().map(error_log_to_admin_response).collect();
    Ok(Json(items))
}
