//! HTTP adapter for getting purchased documents to the buyer.
//!
//! - `GET /downloads/orders/:order_id/:token` - Download page
//! - `GET /files/*path` - Signed file URL, served by the front proxy
//! - `GET /deliveries/:token` - One-shot delivery
//! - `POST /orders/resend` - Self-service resend
//! - `POST /operator/orders/:order_id/resend` - Operator resend
//! - `GET /bonus/kit-preparation/start` - Bonus link landing

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::PROTECTED_LOCATION;
pub use routes::delivery_routes;
