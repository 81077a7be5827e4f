//! Webhook signature verification.
//!
//! The provider signs the exact request bytes with HMAC-SHA256 under a shared
//! secret. Providers disagree on how the digest is written, so hex, base64
//! (standard or URL-safe, padded or not) and `sha256=<hex>` are all accepted.
//! Anything unparseable is simply invalid.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::{constant_time_eq, hmac_sha256, DIGEST_LEN};

/// Longest signature value worth decoding.
const MAX_SIGNATURE_LEN: usize = 256;

/// Verifies inbound notification signatures against the shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Returns true when `supplied` is a valid signature of `message`.
    ///
    /// `message` must be the bytes exactly as received.
    pub fn verify(&self, message: &[u8], supplied: &str) -> bool {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return false;
        }
        let Some(candidate) = decode_signature(supplied) else {
            return false;
        };
        let expected = hmac_sha256(secret.as_bytes(), message);
        constant_time_eq(&expected, &candidate)
    }

    /// Hex signature of `message`, as a provider would send it.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(hmac_sha256(self.secret.expose_secret().as_bytes(), message))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

/// Turns a supplied signature string into digest bytes, if it is one.
fn decode_signature(supplied: &str) -> Option<Vec<u8>> {
    let value = supplied.trim();
    if value.is_empty() || value.len() > MAX_SIGNATURE_LEN {
        return None;
    }

    let value = match value.split_once('=') {
        Some((algorithm, digest)) if is_algorithm_label(algorithm) => {
            if !algorithm.eq_ignore_ascii_case("sha256") {
                return None;
            }
            digest
        }
        _ => value,
    };

    if value.len() == DIGEST_LEN * 2 {
        if let Ok(bytes) = hex::decode(value) {
            return Some(bytes);
        }
    }

    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(value).ok())
        .filter(|bytes| bytes.len() == DIGEST_LEN)
}

/// `sha256`, `sha1`, ... but not a base64 body that happens to contain `=`.
fn is_algorithm_label(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 10
        && candidate.chars().all(|c| c.is_ascii_alphanumeric())
        && candidate.chars().any(|c| c.is_ascii_alphabetic())
        && candidate.to_ascii_lowercase().starts_with("sha")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const BODY: &[u8] = br#"{"transaction_id":"TXN-1","status":"SUCCESS"}"#;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn digest() -> Vec<u8> {
        hmac_sha256(SECRET.as_bytes(), BODY)
    }

    // ══════════════════════════════════════════════════════════════
    // Accepted encodings
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_lowercase_hex() {
        assert!(verifier().verify(BODY, &hex::encode(digest())));
    }

    #[test]
    fn accepts_uppercase_hex() {
        assert!(verifier().verify(BODY, &hex::encode_upper(digest())));
    }

    #[test]
    fn accepts_prefixed_hex() {
        let sig = format!("sha256={}", hex::encode(digest()));
        assert!(verifier().verify(BODY, &sig));
        let sig = format!("SHA256={}", hex::encode(digest()));
        assert!(verifier().verify(BODY, &sig));
    }

    #[test]
    fn accepts_base64_variants() {
        assert!(verifier().verify(BODY, &STANDARD.encode(digest())));
        assert!(verifier().verify(BODY, &STANDARD_NO_PAD.encode(digest())));
        assert!(verifier().verify(BODY, &URL_SAFE.encode(digest())));
        assert!(verifier().verify(BODY, &URL_SAFE_NO_PAD.encode(digest())));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let sig = format!("  {}\n", hex::encode(digest()));
        assert!(verifier().verify(BODY, &sig));
    }

    #[test]
    fn sign_hex_verifies() {
        let v = verifier();
        assert!(v.verify(BODY, &v.sign_hex(BODY)));
    }

    // ══════════════════════════════════════════════════════════════
    // Rejections
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn rejects_bad_and_empty_values() {
        let v = verifier();
        assert!(!v.verify(BODY, "bad"));
        assert!(!v.verify(BODY, ""));
        assert!(!v.verify(BODY, "sha256="));
        assert!(!v.verify(BODY, &"a".repeat(1000)));
    }

    #[test]
    fn rejects_other_algorithms() {
        let sig = format!("sha1={}", hex::encode(digest()));
        assert!(!verifier().verify(BODY, &sig));
    }

    #[test]
    fn rejects_truncated_digest() {
        let sig = hex::encode(&digest()[..16]);
        assert!(!verifier().verify(BODY, &sig));
    }

    #[test]
    fn rejects_signature_from_other_secret() {
        let other = SignatureVerifier::new(SecretString::new("another".to_string()));
        assert!(!verifier().verify(BODY, &other.sign_hex(BODY)));
    }

    #[test]
    fn rejects_everything_without_a_secret() {
        let v = SignatureVerifier::new(SecretString::new(String::new()));
        let sig = hex::encode(hmac_sha256(b"", BODY));
        assert!(!v.verify(BODY, &sig));
    }

    #[test]
    fn reserialized_json_does_not_verify() {
        let sig = verifier().sign_hex(BODY);
        let reparsed: serde_json::Value = serde_json::from_slice(BODY).unwrap();
        let pretty = serde_json::to_vec_pretty(&reparsed).unwrap();
        assert!(!verifier().verify(&pretty, &sig));
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn any_signed_body_verifies(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            secret in "[a-zA-Z0-9_]{1,64}",
        ) {
            let v = SignatureVerifier::new(SecretString::new(secret));
            let sig = v.sign_hex(&body);
            prop_assert!(v.verify(&body, &sig));
        }

        #[test]
        fn single_byte_mutation_invalidates(
            body in proptest::collection::vec(any::<u8>(), 1..512),
            secret in "[a-zA-Z0-9_]{1,64}",
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let v = SignatureVerifier::new(SecretString::new(secret));
            let sig = v.sign_hex(&body);
            let mut mutated = body.clone();
            let i = index.index(mutated.len());
            mutated[i] ^= flip;
            prop_assert!(!v.verify(&mutated, &sig));
        }

        #[test]
        fn arbitrary_strings_never_panic(supplied in ".{0,300}") {
            let _ = verifier().verify(BODY, &supplied);
        }
    }
}
