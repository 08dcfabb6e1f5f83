//! JSON objects exchanged on the wire.
//!
//! Payload structs deserialize the interesting subset of the provider's
//! webhook bodies — everything else stays in the opaque stored document.

pub mod ack;
pub mod admin;
pub mod catalog;
pub mod checkouts;
pub mod notifications;
pub mod orders;
pub mod workflows;

pub use ack::WebhookAck;
pub use notifications::{NotificationKind, NotificationRequest};
pub use workflows::{MonitoringRequest, WorkflowRequest, WorkflowRunResponse};
