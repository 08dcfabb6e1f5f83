//! Order lifecycle payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subset of an order webhook body the handlers act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    /// Links a converted checkout back to its abandoned-checkout job.
    #[serde(default)]
    pub checkout_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_paid_order_body() {
        let body = r##"{"id": 555666777, "name": "#1001", "total_price": "149.99"}"##;
        let order: OrderPayload = serde_json::from_str(body).unwrap();
        assert_eq!(order.id, 555666777);
        assert_eq!(order.name.as_deref(), Some("#1001"));
        assert_eq!(
            order.total_price,
            Some(Decimal::new(14999, 2)),
        );
        assert!(order.checkout_token.is_none());
    }
}
