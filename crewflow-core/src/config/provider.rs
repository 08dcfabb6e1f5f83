//! Webhook provider configuration.

use crewflow_sdk::Topic;
use url::Url;

/// Settings for the upstream e-commerce provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Shared secret for inbound webhook HMAC verification.
    pub webhook_secret: Box<[u8]>,
    /// Public base URL of this deployment, used to build the delivery
    /// address recorded on new subscriptions.
    pub base_url: Url,
    /// Inventory level at or below which a low-stock alert is emitted.
    pub low_stock_threshold: i64,
}

impl ProviderConfig {
    pub fn new(
        webhook_secret: impl Into<Box<[u8]>>,
        base_url: Url,
        low_stock_threshold: i64,
    ) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            base_url,
            low_stock_threshold,
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.webhook_secret
    }

    /// The address the provider delivers `topic` to for this deployment.
    pub fn delivery_address(&self, topic: Topic) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/webhooks/{}", topic.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_address_joins_base_and_topic() {
        let config = ProviderConfig::new(
            b"secret".as_slice(),
            Url::parse("https://hooks.crewflow.dev/").unwrap(),
            5,
        );
        assert_eq!(
            config.delivery_address(Topic::OrdersPaid),
            "https://hooks.crewflow.dev/webhooks/orders/paid"
        );
    }
}
