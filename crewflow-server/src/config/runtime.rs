//! Runtime configuration re-exports.
//!
//! The actual config types are defined in `crewflow-core::config`; this
//! module re-exports them for the server's own modules.

pub use crewflow_core::config::{
    AdminConfig, ProviderConfig, ResilienceConfig, ServerConfig, SharedConfig,
};
