//! Admin API authentication configuration.

/// Admin configuration.
///
/// The secret is compared in constant time against the
/// `X-CrewFlow-Admin-Authorization` header.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    secret: Box<[u8]>,
}

impl AdminConfig {
    pub fn new(secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}
