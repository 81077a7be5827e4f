//! HTTP adapter for entitlement-gated content.
//!
//! - `GET /downloads/categories/:slug` - Gated category listing
//! - `POST /claims` - Claim access after a purchase

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::entitlement_routes;
