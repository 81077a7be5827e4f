//! Top-level router: all routes, bearer authentication and the tower-http stack.

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::delivery::delivery_routes;
use super::entitlement::entitlement_routes;
use super::middleware::auth_middleware;
use super::payment::payment_routes;
use super::state::AppState;

/// GET /health - liveness
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the complete application router.
///
/// Every route sits behind the optional bearer middleware; routes that need
/// an account use `RequireAuth`.
pub fn app_router(state: AppState, server: &ServerConfig) -> Router {
    let validator = state.session_validator.clone();

    let mut app = Router::new()
        .route("/health", get(health))
        .merge(payment_routes())
        .merge(delivery_routes())
        .merge(entitlement_routes())
        .layer(axum::middleware::from_fn_with_state(validator, auth_middleware))
        .with_state(state);

    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if !origins.is_empty() {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST]),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CompressionLayer::new()),
    )
}
