//! Signed session cookie.
//!
//! Value format: `base64url(json)` `.` `hex(hmac_sha256(secret, base64url(json)))`.
//! The cookie only ever holds identities this service verified itself: an
//! email proven by a token, a claim or a bonus link, and an imported claim code.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{constant_time_eq, hmac_sha256};

pub const SESSION_COOKIE: &str = "paygate_session";

/// Cookie lifetime in seconds (30 days).
const SESSION_MAX_AGE: i64 = 30 * 24 * 60 * 60;

/// What the session remembers about the visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_code: Option<String>,
}

impl SessionData {
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.verified_email = Some(email.into());
        self
    }
}

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct SessionCodec {
    secret: SecretString,
    secure: bool,
}

impl SessionCodec {
    /// `secure` adds the `Secure` attribute; set it wherever TLS terminates in front.
    pub fn new(secret: SecretString, secure: bool) -> Self {
        Self { secret, secure }
    }

    pub fn encode(&self, data: &SessionData) -> String {
        let json = serde_json::to_vec(data).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        format!("{}.{}", payload, hex::encode(self.mac(&payload)))
    }

    /// `None` for anything not signed by us.
    pub fn decode(&self, value: &str) -> Option<SessionData> {
        let (payload, sig) = value.trim().split_once('.')?;
        let supplied = hex::decode(sig).ok()?;
        if !constant_time_eq(&self.mac(payload), &supplied) {
            return None;
        }
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// Reads the session from request headers; an absent or forged cookie is an empty session.
    pub fn read(&self, headers: &HeaderMap) -> SessionData {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .and_then(|(_, value)| self.decode(value))
            .unwrap_or_default()
    }

    /// `Set-Cookie` header carrying `data`.
    pub fn set_cookie(&self, data: &SessionData) -> (axum::http::HeaderName, HeaderValue) {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            self.encode(data),
            SESSION_MAX_AGE
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        let value = HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""));
        (SET_COOKIE, value)
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        hmac_sha256(self.secret.expose_secret().as_bytes(), payload.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new(SecretString::new("s".repeat(32)), false)
    }

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn session_survives_a_round_trip_through_headers() {
        let codec = codec();
        let data = SessionData::default().with_email("buyer@example.com");
        let (_, set_cookie) = codec.set_cookie(&data);
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();

        let read = codec.read(&headers_with_cookie(&format!("theme=dark; {}", pair)));
        assert_eq!(read.verified_email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn tampered_cookie_reads_as_empty() {
        let codec = codec();
        let value = codec.encode(&SessionData::default().with_email("buyer@example.com"));
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"verified_email":"thief@example.com"}"#);
        let (_, sig) = value.split_once('.').unwrap();
        let forged = format!("{}={}.{}", SESSION_COOKIE, forged_payload, sig);

        assert_eq!(codec.read(&headers_with_cookie(&forged)), SessionData::default());
    }

    #[test]
    fn cookie_from_another_secret_is_rejected() {
        let other = SessionCodec::new(SecretString::new("o".repeat(32)), false);
        let value = other.encode(&SessionData::default().with_email("buyer@example.com"));
        assert_eq!(codec().decode(&value), None);
    }

    #[test]
    fn secure_flag_is_added_when_requested() {
        let codec = SessionCodec::new(SecretString::new("s".repeat(32)), true);
        let (_, value) = codec.set_cookie(&SessionData::default());
        assert!(value.to_str().unwrap().ends_with("; Secure"));
    }
}
