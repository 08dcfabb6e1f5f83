use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;

use crate::api::admin::{AdminApiError, subscription_to_admin_response};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;
use crewflow_core::entities::webhook_subscriptions::UpsertSubscription;
use crewflow_core::framework::DatabaseProcessor;
use crewflow_sdk::Topic;
use crewflow_sdk::objects::admin::RegisterSubscriptionRequest;

/// `POST /admin/subscriptions` — register a store's topic subscription.
///
/// The delivery address is derived from the configured base URL; a
/// repeat registration re-enables a disabled subscription.
pub(crate) async fn register_subscription(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(request): Json<RegisterSubscriptionRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let Some(topic) = Topic::parse(&request.topic) else {
        return Err(AdminApiError::UnknownTopic(request.topic));
    };

    let address = {
        let provider = state.config.provider.read().await;
        provider.delivery_address(topic)
    };

    let processor = DatabaseProcessor::new(state.db.clone());
    let record = processor
        .process(UpsertSubscription {
            tenant_id: request.tenant_id,
            store_domain: request.store_domain,
            topic: topic.as_str().to_owned(),
            address,
            metadata: request.metadata,
        })
        .await
        .map_err(AdminApiError::Database)?;

    Ok((
        StatusCode::CREATED,
        Json(subscription_to_admin_response(&record)),
    ))
}
