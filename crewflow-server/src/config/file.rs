//! TOML file configuration structures.
//!
//! These structs directly map to the `crewflow-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerSection,
    pub admin: AdminSection,
    pub provider: ProviderSection,
    pub collaborators: CollaboratorsSection,
    #[serde(default)]
    pub resilience: ResilienceSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Admin API authentication section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSection {
    /// Plaintext admin secret, compared in constant time.
    pub secret: String,
}

/// Webhook provider section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    /// Shared secret for inbound webhook HMAC verification.
    pub webhook_secret: String,
    /// Public base URL used to build subscription delivery addresses.
    pub base_url: Url,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    5
}

/// Endpoints of the collaborator services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsSection {
    pub workflow_engine_url: Url,
    pub notification_url: Url,
    pub monitoring_url: Url,
}

/// Retry / circuit-breaker tuning. All fields default to the standard
/// policy when the section is omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceSection {
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub breaker: BreakerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_multiplier() -> u32 {
    2
}
fn default_max_jitter_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSection {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
}

impl Default for BreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_open_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "admin-secret"

[provider]
webhook_secret = "hook-secret"
base_url = "https://hooks.crewflow.dev"
low_stock_threshold = 3

[collaborators]
workflow_engine_url = "http://workflows.internal/"
notification_url = "http://notifications.internal/"
monitoring_url = "http://monitoring.internal/"

[resilience.retry]
max_retries = 5

[resilience.breaker]
failure_threshold = 2
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.provider.low_stock_threshold, 3);
        assert_eq!(config.resilience.retry.max_retries, 5);
        // Unset fields fall back per-field, not per-section.
        assert_eq!(config.resilience.retry.base_delay_ms, 1000);
        assert_eq!(config.resilience.breaker.failure_threshold, 2);
        assert_eq!(config.resilience.breaker.open_timeout_secs, 60);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let toml_str = r#"
[server]

[admin]
secret = "admin-secret"

[provider]
webhook_secret = "hook-secret"
base_url = "https://hooks.crewflow.dev"

[collaborators]
workflow_engine_url = "http://workflows.internal/"
notification_url = "http://notifications.internal/"
monitoring_url = "http://monitoring.internal/"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.provider.low_stock_threshold, 5);
        assert_eq!(config.resilience.retry.max_retries, 3);
        assert_eq!(config.resilience.breaker.failure_threshold, 5);
    }
}
