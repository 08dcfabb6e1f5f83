//! The response body for inbound webhook deliveries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Acknowledgement returned to the webhook producer.
///
/// `success: false` before a 2xx response is what makes the provider's
/// own redelivery mechanism kick in, so the pipeline is careful to only
/// report success once the event has reached a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    /// Successful processing (or an intentional ignore).
    pub fn accepted(event_id: Option<Uuid>) -> Self {
        Self {
            success: true,
            event_id,
            error: None,
        }
    }

    /// Rejected before any row was written.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            event_id: None,
            error: Some(error.into()),
        }
    }

    /// Processing started but the handler failed; the event row exists
    /// with status `failed`.
    pub fn failed(event_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            success: false,
            event_id: Some(event_id),
            error: Some(error.into()),
        }
    }
}
