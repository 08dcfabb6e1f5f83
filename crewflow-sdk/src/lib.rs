//! Shared wire-level types for CrewFlow.
//!
//! This crate holds everything both the server and external integrators
//! need to agree on: the webhook topic catalog, the HMAC signature scheme
//! for inbound deliveries, and the JSON objects exchanged with the
//! workflow, notification, and monitoring collaborator services.

pub mod objects;
pub mod signature;
pub mod topics;

pub use topics::Topic;
