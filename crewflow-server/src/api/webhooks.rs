//! The inbound webhook endpoint.
//!
//! `POST /webhooks/{*topic}` — the topic comes from the path, never from
//! the body. The raw bytes are handed to the pipeline unmodified so the
//! HMAC is computed over exactly what arrived on the wire.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;

use crate::state::AppState;
use crewflow_core::pipeline::InboundDelivery;
use crewflow_sdk::objects::WebhookAck;
use crewflow_sdk::signature::{EVENT_ID_HEADER, SHOP_DOMAIN_HEADER, SIGNATURE_HEADER};

pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(store_domain) = header_string(&headers, SHOP_DOMAIN_HEADER) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookAck::rejected(format!(
                "missing {SHOP_DOMAIN_HEADER} header"
            ))),
        );
    };

    let delivery = InboundDelivery {
        topic,
        store_domain: store_domain.into(),
        provider_event_id: header_string(&headers, EVENT_ID_HEADER),
        signature: header_string(&headers, SIGNATURE_HEADER),
        body,
        headers: audit_headers(&headers),
    };

    let ack = state.processor.process_webhook(delivery).await;
    (ack_status(&ack), Json(ack))
}

/// Status code choice drives the provider's redelivery: 2xx settles the
/// delivery, anything else redelivers.
fn ack_status(ack: &WebhookAck) -> StatusCode {
    if ack.success {
        StatusCode::OK
    } else if ack.error.as_deref() == Some("Invalid webhook signature") {
        StatusCode::UNAUTHORIZED
    } else if ack.event_id.is_some() {
        // Recorded but handlers failed; provider retry gets another shot.
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// The subset of request headers stored with the event for audit.
fn audit_headers(headers: &HeaderMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        let keep = name.as_str().starts_with("x-provider-")
            || name.as_str() == "content-type"
            || name.as_str() == "user-agent";
        if !keep {
            continue;
        }
        if let Ok(value) = value.to_str() {
            map.insert(
                name.as_str().to_owned(),
                serde_json::Value::String(value.to_owned()),
            );
        }
    }
    serde_json::Value::Object(map)
}
