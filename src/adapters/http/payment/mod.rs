//! HTTP adapter for checkout and payment confirmation.
//!
//! - `POST /checkout` - Create a PENDING order
//! - `POST /webhooks/:provider` - Inbound provider notification
//! - `GET /payments/return` - Return page after payment

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::SIGNATURE_HEADER;
pub use routes::payment_routes;
