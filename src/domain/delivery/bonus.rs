//! Bonus claim links.
//!
//! Token format: `base64url(order_ref:email:issued_unix)` `.` `hex(hmac)`.
//! The email travels in the token so the landing page can identify the buyer
//! without a login.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{constant_time_eq, hmac_sha256, Timestamp};

use super::errors::LinkError;

/// Separates the bonus salt from the payload in the MAC input.
const SALT: &str = "bonus-kit-preparation";

/// What a verified bonus token says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusClaim {
    pub order_ref: String,
    pub email: String,
    pub issued_at: Timestamp,
}

#[derive(Clone)]
pub struct BonusLinkSigner {
    secret: SecretString,
    ttl: Duration,
}

impl BonusLinkSigner {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn issue(&self, order_ref: &str, email: &str, now: Timestamp) -> String {
        let payload = format!("{}:{}:{}", order_ref, email, now.as_unix_secs());
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{}.{}", encoded, hex::encode(self.mac(&encoded)))
    }

    pub fn verify(&self, token: &str, now: Timestamp) -> Result<BonusClaim, LinkError> {
        let (encoded, sig) = token.trim().split_once('.').ok_or(LinkError::Malformed)?;
        let supplied = hex::decode(sig).map_err(|_| LinkError::BadSignature)?;
        if !constant_time_eq(&self.mac(encoded), &supplied) {
            return Err(LinkError::BadSignature);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(LinkError::Malformed)?;
        // timestamp is last; references never contain ':'
        let (head, issued) = payload.rsplit_once(':').ok_or(LinkError::Malformed)?;
        let (order_ref, email) = head.split_once(':').ok_or(LinkError::Malformed)?;
        let issued_at = issued
            .parse::<i64>()
            .ok()
            .and_then(Timestamp::from_unix_secs)
            .ok_or(LinkError::Malformed)?;

        if !now.is_before(&issued_at.plus(self.ttl)) {
            return Err(LinkError::Expired);
        }

        Ok(BonusClaim {
            order_ref: order_ref.to_string(),
            email: email.to_string(),
            issued_at,
        })
    }

    fn mac(&self, encoded: &str) -> Vec<u8> {
        let message = format!("{}:{}", SALT, encoded);
        hmac_sha256(self.secret.expose_secret().as_bytes(), message.as_bytes())
    }
}

impl std::fmt::Debug for BonusLinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BonusLinkSigner").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}
