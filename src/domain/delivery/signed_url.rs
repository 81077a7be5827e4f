//! Short-lived signed file URLs.
//!
//! `/files/{path}?expires={unix}&sig={hex}` where `sig` is the HMAC of
//! `"{path}:{expires}"`. Emails carry these instead of the long-lived token.

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{constant_time_eq, hmac_sha256, Timestamp};

use super::errors::LinkError;

/// Mount point of signed file URLs.
pub const FILES_PREFIX: &str = "/files/";

#[derive(Clone)]
pub struct UrlSigner {
    secret: SecretString,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Relative URL for `path`, valid for the configured lifetime.
    pub fn sign(&self, path: &str, now: Timestamp) -> String {
        let path = path.trim_start_matches('/');
        let expires = now.plus(self.ttl).as_unix_secs();
        let sig = hex::encode(self.mac(path, expires));
        format!("{}{}?expires={}&sig={}", FILES_PREFIX, path, expires, sig)
    }

    /// Checks a presented `(path, expires, sig)` triple.
    pub fn verify(&self, path: &str, expires: i64, sig: &str, now: Timestamp) -> Result<(), LinkError> {
        let path = path.trim_start_matches('/');
        if path.is_empty() || path.split('/').any(|segment| segment == "..") {
            return Err(LinkError::Malformed);
        }
        let supplied = hex::decode(sig).map_err(|_| LinkError::BadSignature)?;
        if !constant_time_eq(&self.mac(path, expires), &supplied) {
            return Err(LinkError::BadSignature);
        }
        if now.as_unix_secs() >= expires {
            return Err(LinkError::Expired);
        }
        Ok(())
    }

    fn mac(&self, path: &str, expires: i64) -> Vec<u8> {
        let message = format!("{}:{}", path, expires);
        hmac_sha256(self.secret.expose_secret().as_bytes(), message.as_bytes())
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new(SecretString::new("x".repeat(32)), Duration::minutes(15))
    }

    /// Splits a signed URL back into its parts.
    fn parts(url: &str) -> (String, i64, String) {
        let rest = url.strip_prefix(FILES_PREFIX).unwrap();
        let (path, query) = rest.split_once('?').unwrap();
        let mut expires = 0;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }
        (path.to_string(), expires, sig)
    }

    #[test]
    fn signed_url_verifies_within_window() {
        let now = Timestamp::now();
        let url = signer().sign("ebooks/guide-a4.pdf", now);
        let (path, expires, sig) = parts(&url);
        assert_eq!(path, "ebooks/guide-a4.pdf");
        assert_eq!(expires, now.plus(Duration::minutes(15)).as_unix_secs());
        assert!(signer().verify(&path, expires, &sig, now.plus(Duration::minutes(14))).is_ok());
    }

    #[test]
    fn signed_url_expires() {
        let now = Timestamp::now();
        let (path, expires, sig) = parts(&signer().sign("a.pdf", now));
        assert_eq!(
            signer().verify(&path, expires, &sig, now.plus(Duration::minutes(16))),
            Err(LinkError::Expired)
        );
    }

    #[test]
    fn tampered_path_or_expiry_is_rejected() {
        let now = Timestamp::now();
        let (path, expires, sig) = parts(&signer().sign("a.pdf", now));
        assert_eq!(
            signer().verify("b.pdf", expires, &sig, now),
            Err(LinkError::BadSignature)
        );
        assert_eq!(
            signer().verify(&path, expires + 3600, &sig, now),
            Err(LinkError::BadSignature)
        );
        assert_eq!(
            signer().verify(&path, expires, "zz", now),
            Err(LinkError::BadSignature)
        );
    }

    #[test]
    fn traversal_is_malformed() {
        assert_eq!(
            signer().verify("../etc/passwd", 0, "", Timestamp::now()),
            Err(LinkError::Malformed)
        );
    }
}
