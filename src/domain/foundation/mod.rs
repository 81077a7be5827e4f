//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait, errors and the
//! authenticated account type.

mod auth;
mod errors;
mod ids;
mod mac;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EntitlementId, LedgerEntryId, OrderId, TokenId, UserId};
pub use mac::{constant_time_eq, hmac_sha256, hmac_sha256_hex, DIGEST_LEN};
pub use state_machine::{StateMachine, TransitionError};
pub use timestamp::Timestamp;

/// Lowercases and trims an email address; `None` when it is not plausibly one.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return None;
    }
    Some(email)
}
