//! Authenticated account identity.
//!
//! Populated by whatever `SessionValidator` adapter checked the bearer token;
//! the domain only needs the account id and its email.

use super::UserId;
use thiserror::Error;

/// Account extracted from a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier from the auth provider.
    pub id: UserId,

    /// Account email, lowercased.
    pub email: String,

    /// Whether the provider verified the email address.
    pub email_verified: bool,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: impl Into<String>, email_verified: bool) -> Self {
        Self {
            id,
            email: email.into().trim().to_lowercase(),
            email_verified,
        }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the account may not perform this action.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// The authentication backend is unavailable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
