//! Objects sent to the notification collaborator service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SystemAlert,
    OrderActivity,
    InventoryAlert,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::SystemAlert => write!(f, "system_alert"),
            NotificationKind::OrderActivity => write!(f, "order_activity"),
            NotificationKind::InventoryAlert => write!(f, "inventory_alert"),
        }
    }
}

/// A notification creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub tenant_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub options: serde_json::Value,
}
