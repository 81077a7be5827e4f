//! Shared-secret JWT adapter for bearer token validation.
//!
//! Accounts are issued by a separate service that signs HS256 tokens with a
//! secret shared with this one. Validation checks:
//!
//! - **Signature** against the shared secret
//! - **Issuer (iss)** equal to the configured issuer
//! - **Audience (aud)** containing the configured audience
//! - **Expiry (exp)** in the future
//!
//! The `email` claim is required; entitlements are keyed by email.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// JWT claims accepted from the accounts service.
#[derive(Debug, Serialize, Deserialize)]
struct AccountClaims {
    /// Subject - the account ID
    sub: String,

    iss: String,

    #[serde(default)]
    aud: Audience,

    exp: i64,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    email_verified: Option<bool>,
}

/// Audience can be a single string or array of strings in JWTs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == expected,
            Audience::Multiple(v) => v.iter().any(|s| s == expected),
        }
    }
}

pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl JwtSessionValidator {
    pub fn new(secret: &SecretString, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data = decode::<AccountClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer => {
                        tracing::warn!("Invalid issuer in token");
                        AuthError::InvalidToken
                    }
                    ErrorKind::InvalidAudience => {
                        tracing::warn!("Invalid audience in token");
                        AuthError::InvalidToken
                    }
                    _ => {
                        tracing::warn!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?;
        let claims = token_data.claims;

        if !claims.aud.contains(&self.audience) {
            tracing::warn!(audience = ?claims.aud, "Audience mismatch after validation");
            return Err(AuthError::InvalidToken);
        }

        let email = claims.email.ok_or_else(|| {
            tracing::warn!("Token missing email claim");
            AuthError::InvalidToken
        })?;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in token: {}", claims.sub);
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(
            user_id,
            email,
            claims.email_verified.unwrap_or(false),
        ))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(&SecretString::new(SECRET.into()), "accounts", "paygate")
    }

    fn token(iss: &str, aud: &str, exp_offset: i64, email: Option<&str>) -> String {
        let claims = AccountClaims {
            sub: "user-123".into(),
            iss: iss.into(),
            aud: Audience::Single(aud.into()),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            email: email.map(str::to_string),
            email_verified: Some(true),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Accepted tokens
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_token_yields_user() {
        let user = validator()
            .validate(&token("accounts", "paygate", 3600, Some("Buyer@Example.com")))
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "user-123");
        assert_eq!(user.email, "buyer@example.com");
        assert!(user.email_verified);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejections
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn expired_token_is_reported() {
        let result = validator()
            .validate(&token("accounts", "paygate", -3600, Some("a@b.co")))
            .await;
        assert_eq!(result.unwrap_err(), AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn wrong_issuer_or_audience_is_invalid() {
        let v = validator();
        assert_eq!(
            v.validate(&token("other", "paygate", 3600, Some("a@b.co"))).await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            v.validate(&token("accounts", "other", 3600, Some("a@b.co"))).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn missing_email_is_invalid() {
        let result = validator().validate(&token("accounts", "paygate", 3600, None)).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert_eq!(validator().validate("not.a.jwt").await.unwrap_err(), AuthError::InvalidToken);
    }
}
