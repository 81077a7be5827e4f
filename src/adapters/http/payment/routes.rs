//! Axum routes for checkout, provider notifications and the return page.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{create_checkout, handle_webhook, payment_return};

/// Payment routes.
///
/// # Routes
/// - `POST /checkout` - Create an order for a catalog product
/// - `POST /webhooks/:provider` - Provider notification (`cinetpay`, `orange-money`)
/// - `GET /payments/return?transaction_id=` - Buyer lands here after paying
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/webhooks/:provider", post(handle_webhook))
        .route("/payments/return", get(payment_return))
}
