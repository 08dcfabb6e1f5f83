use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use serde::Deserialize;

use crate::api::admin::{AdminApiError, subscription_to_admin_response};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::webhook_subscriptions::ListSubscriptions;
use crewflow_core::framework::DatabaseProcessor;

#[derive(Debug, Deserialize)]
pub(crate) struct ListSubscriptionsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// `GET /admin/subscriptions` — list registered subscriptions.
pub(crate) async fn list_subscriptions(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let processor = DatabaseProcessor::new(state.db.clone());
    let subscriptions = processor
        .process(ListSubscriptions {
            limit: query.limit.clamp(1, 500),
            offset: query.offset.max(0),
        })
        .await
        .map_err(AdminApiError::Database)?;

    let items: Vec<_> = subscriptions
        .iter()
        .map(subscription_to_admin_response)
        .collect();
    Ok(Json(items))
}
