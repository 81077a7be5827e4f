//! HTTP middleware for axum.
//!
//! - `auth` - Bearer authentication middleware and extractors
//! - `headers` - cache and indexing headers for gated content

pub mod auth;
pub mod headers;

pub use auth::{auth_middleware, AuthRejection, AuthState, OptionalAuth, RequireAuth};
pub use headers::{protect_response, PROTECTED_CACHE_CONTROL, PROTECTED_ROBOTS};
