//! Axum routes for download pages, signed files, deliveries, resend and bonus links.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{
    bonus_start, consume_delivery, download_page, operator_resend, resend_by_email, signed_file,
};

/// Delivery routes.
///
/// # Routes
///
/// ## Buyer links (token or signature verified)
/// - `GET /downloads/orders/:order_id/:token` - Download page
/// - `GET /files/*path` - Signed file URL
/// - `GET /deliveries/:token` - One-shot delivery
/// - `GET /bonus/kit-preparation/start` - Bonus link landing
///
/// ## Resend
/// - `POST /orders/resend` - Self-service, always 202
/// - `POST /operator/orders/:order_id/resend` - Operator only
pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/downloads/orders/:order_id/:token", get(download_page))
        .route("/files/*path", get(signed_file))
        .route("/deliveries/:token", get(consume_delivery))
        .route("/bonus/kit-preparation/start", get(bonus_start))
        .route("/orders/resend", post(resend_by_email))
        .route("/operator/orders/:order_id/resend", post(operator_resend))
}
