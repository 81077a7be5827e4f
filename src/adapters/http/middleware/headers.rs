//! Response headers for gated content.
//!
//! Every response for a protected category, allowed or denied, must stay out
//! of shared caches and search indexes, and vary on the identity carriers.

use axum::http::header::{CACHE_CONTROL, VARY};
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;

pub const PROTECTED_CACHE_CONTROL: &str = "no-store, private";
pub const PROTECTED_ROBOTS: &str = "noindex, nofollow";
const PROTECTED_VARY: &str = "Cookie, Authorization";

static X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");

/// Marks `response` as private, uncacheable and unindexable.
pub fn protect_response(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(PROTECTED_CACHE_CONTROL));
    headers.insert(X_ROBOTS_TAG.clone(), HeaderValue::from_static(PROTECTED_ROBOTS));
    headers.insert(VARY, HeaderValue::from_static(PROTECTED_VARY));
}
