//! HTTP DTOs for checkout, webhooks and the return page.

use serde::{Deserialize, Serialize};

use crate::domain::payment::{LedgerOutcome, Order};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub product_sku: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentReturnQuery {
    pub transaction_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A freshly created order, ready to be handed to the provider's checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    /// Reference the provider will echo back in notifications.
    pub transaction_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl From<&Order> for CheckoutResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.to_string(),
            transaction_id: order.external_ref.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            status: order.status.to_string(),
        }
    }
}

/// Acknowledgement sent back to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub outcome: LedgerOutcome,
}

/// Return page state.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReturnResponse {
    pub transaction_id: String,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}
