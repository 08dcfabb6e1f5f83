//! Cart and checkout lifecycle payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subset of a checkout webhook body the handlers act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub id: i64,
    /// Stable token identifying the checkout across its lifecycle; the
    /// abandoned-checkout job is keyed on it.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub abandoned_checkout_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The subset of a cart webhook body the handlers act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartPayload {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
}
