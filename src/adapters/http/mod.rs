//! HTTP adapter - the axum surface of the payment pipeline.
//!
//! Each area has its own `dto` / `handlers` / `routes`:
//! - `payment` - checkout, provider notifications, return page
//! - `delivery` - download page, signed files, one-shot deliveries, resend, bonus
//! - `entitlement` - gated categories and claims
//!
//! Shared pieces: `state` (ports and handler factories), `session` (signed
//! cookie), `error` (JSON error bodies), `middleware` (bearer auth and
//! gated-content headers).

pub mod delivery;
pub mod entitlement;
pub mod error;
pub mod middleware;
pub mod payment;
pub mod session;
pub mod state;

mod router;

pub use error::{ApiError, ErrorResponse};
pub use router::app_router;
pub use session::{SessionCodec, SessionData, SESSION_COOKIE};
pub use state::{AppState, HttpSettings};
