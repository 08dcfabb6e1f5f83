//! The classified error type shared across the subsystem.
//!
//! Every handled failure carries a kind from the fixed taxonomy, a
//! severity, and a retryable flag derived from the kind. The retry
//! manager consults the flag; the error reporter persists the kind and
//! severity and escalates critical errors to a user notification.

use thiserror::Error;

/// Fixed error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Api,
    Authentication,
    Authorization,
    Validation,
    RateLimit,
    Timeout,
    Storage,
    Webhook,
    BusinessLogic,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Api => "api",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "storage",
            ErrorKind::Webhook => "webhook",
            ErrorKind::BusinessLogic => "business_logic",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Transient kinds worth retrying. Everything else fails immediately.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit
        )
    }

    pub fn default_severity(self) -> Severity {
        match self {
            ErrorKind::Validation | ErrorKind::RateLimit => Severity::Low,
            ErrorKind::Network
            | ErrorKind::Timeout
            | ErrorKind::Api
            | ErrorKind::Webhook
            | ErrorKind::BusinessLogic => Severity::Medium,
            ErrorKind::Authentication | ErrorKind::Authorization | ErrorKind::Storage => {
                Severity::High
            }
            ErrorKind::Unknown => Severity::Critical,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to every classified error.
///
/// Stored in `error_logs.severity`; `Critical` triggers an immediate
/// user notification from the error reporter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "severity_level", rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, handled error.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct FlowError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FlowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn webhook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Webhook, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BusinessLogic, message)
    }

    /// Fail-fast error produced by an open circuit breaker.
    pub fn service_unavailable(service: &str) -> Self {
        Self::new(
            ErrorKind::Api,
            format!("{service} is temporarily unavailable"),
        )
        .with_severity(Severity::High)
    }
}

impl From<sqlx::Error> for FlowError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(ErrorKind::Storage, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Validation, err.to_string()).with_source(err)
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 => ErrorKind::Authentication,
                403 => ErrorKind::Authorization,
                429 => ErrorKind::RateLimit,
                _ => ErrorKind::Api,
            }
        } else if err.is_connect() {
            ErrorKind::Network
        } else if err.is_decode() {
            ErrorKind::Api
        } else {
            ErrorKind::Network
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds_are_the_transient_ones() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(!ErrorKind::Api.is_retryable());
        assert!(!ErrorKind::Storage.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn severity_defaults_follow_the_kind() {
        assert_eq!(FlowError::validation("bad").severity, Severity::Low);
        assert_eq!(FlowError::network("down").severity, Severity::Medium);
        assert_eq!(FlowError::storage("db").severity, Severity::High);
        assert_eq!(
            FlowError::new(ErrorKind::Unknown, "???").severity,
            Severity::Critical
        );
    }

    #[test]
    fn breaker_error_is_not_retryable() {
        let err = FlowError::service_unavailable("workflow-engine");
        assert!(!err.is_retryable());
        assert_eq!(err.kind, ErrorKind::Api);
        assert!(err.message.contains("workflow-engine"));
    }

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }
}
