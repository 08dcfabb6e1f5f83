//! Configuration loading for crewflow-server.
//!
//! Handles the TOML file, CLI overrides, and environment variables, and
//! converts the parsed sections into the shared runtime types defined in
//! `crewflow-core::config`.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    AdminConfig, ProviderConfig, ResilienceConfig, ServerConfig, SharedConfig,
};
use crewflow_core::resilience::breaker::BreakerSettings;
use crewflow_core::resilience::retry::RetryPolicy;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

/// Environment variable overriding `provider.webhook_secret`.
pub const WEBHOOK_SECRET_ENV: &str = "CREWFLOW_WEBHOOK_SECRET";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Endpoints of the collaborator services. Fixed at startup; a SIGHUP
/// reload does not rebuild the HTTP clients.
#[derive(Debug, Clone)]
pub struct CollaboratorEndpoints {
    pub workflow_engine_url: Url,
    pub notification_url: Url,
    pub monitoring_url: Url,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub provider: ProviderConfig,
    pub resilience: ResilienceConfig,
    pub collaborators: CollaboratorEndpoints,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with separate locks per section.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            admin: Arc::new(RwLock::new(self.admin)),
            provider: Arc::new(RwLock::new(self.provider)),
            resilience: Arc::new(RwLock::new(self.resilience)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI and environment overrides,
    /// validate, and build the runtime configuration.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        // The webhook secret can live outside the config file.
        if let Ok(secret) = std::env::var(WEBHOOK_SECRET_ENV) {
            file_config.provider.webhook_secret = secret;
        }

        self.validate(&file_config)?;

        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.provider.webhook_secret.is_empty() {
            return Err(ConfigError::Validation(
                "provider.webhook_secret must not be empty".to_owned(),
            ));
        }
        if config.admin.secret.is_empty() {
            return Err(ConfigError::Validation(
                "admin.secret must not be empty".to_owned(),
            ));
        }
        if config.provider.base_url.host_str().is_none() {
            return Err(ConfigError::Validation(
                "provider.base_url must have a host".to_owned(),
            ));
        }
        Ok(())
    }
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    let retry = RetryPolicy {
        max_retries: file_config.resilience.retry.max_retries,
        base_delay: Duration::from_millis(file_config.resilience.retry.base_delay_ms),
        max_delay: Duration::from_millis(file_config.resilience.retry.max_delay_ms),
        multiplier: file_config.resilience.retry.multiplier,
        max_jitter: Duration::from_millis(file_config.resilience.retry.max_jitter_ms),
    };
    let breaker = BreakerSettings {
        failure_threshold: file_config.resilience.breaker.failure_threshold,
        open_timeout: Duration::from_secs(file_config.resilience.breaker.open_timeout_secs),
    };

    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(file_config.admin.secret.into_bytes()),
        provider: ProviderConfig::new(
            file_config.provider.webhook_secret.into_bytes(),
            file_config.provider.base_url,
            file_config.provider.low_stock_threshold,
        ),
        resilience: ResilienceConfig { retry, breaker },
        collaborators: CollaboratorEndpoints {
            workflow_engine_url: file_config.collaborators.workflow_engine_url,
            notification_url: file_config.collaborators.notification_url,
            monitoring_url: file_config.collaborators.monitoring_url,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
