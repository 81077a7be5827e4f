//! Axum routes for gated categories and claims.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{category_page, submit_claim};

/// Entitlement routes.
///
/// # Routes
/// - `GET /downloads/categories/:slug` - Gated category listing
/// - `POST /claims` - Claim access with an email or a claim code
pub fn entitlement_routes() -> Router<AppState> {
    Router::new()
        .route("/downloads/categories/:slug", get(category_page))
        .route("/claims", post(submit_claim))
}
