use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use uuid::Uuid;

use crate::api::admin::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::error_logs::ResolveErrorLog;
use crewflow_core::framework::DatabaseProcessor;

/// `POST /admin/errors/{error_id}/resolve` — mark an error log resolved.
pub(crate) async fn resolve_error_log(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(error_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor::new(state.db.clone());
    let resolved = processor
        .process(ResolveErrorLog { id: error_id })
        .await
        .map_err(AdminApiError::Database)?;

    if !resolved {
        return Err(AdminApiError::NotFound);
    }
    Ok(Json(serde_json::json!({ "resolved": true })))
}
