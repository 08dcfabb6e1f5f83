//! Validated runtime configuration shared across crates.
//!
//! The server crate owns loading and parsing (TOML file, CLI overrides,
//! environment); these are the in-memory types it produces. Sections are
//! individually locked so a SIGHUP reload of one section does not block
//! readers of the others.

mod admin;
mod provider;
mod resilience;
mod server;

pub use admin::AdminConfig;
pub use provider::ProviderConfig;
pub use resilience::ResilienceConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin API authentication.
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Webhook provider settings (shared secret, delivery base URL).
    pub provider: Arc<RwLock<ProviderConfig>>,
    /// Retry and circuit-breaker tuning.
    pub resilience: Arc<RwLock<ResilienceConfig>>,
}
