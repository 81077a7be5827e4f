//! Email configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Email configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key; without it, outgoing mail is only logged
    pub resend_api_key: Option<SecretString>,

    /// Resend endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EmailConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The API key, when one is configured and non-empty.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.resend_api_key
            .as_ref()
            .filter(|k| !k.expose_secret().is_empty())
    }

    /// Validate email configuration
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        match self.api_key() {
            Some(key) if !key.expose_secret().starts_with("re_") => {
                return Err(ValidationError::InvalidResendKey);
            }
            None if environment == Environment::Production => {
                return Err(ValidationError::MissingRequired("EMAIL__RESEND_API_KEY"));
            }
            _ => {}
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            api_url: default_api_url(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_from_email() -> String {
    "commandes@example.com".to_string()
}

fn default_from_name() -> String {
    "Boutique".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        let config = EmailConfig {
            from_email: "support@example.com".to_string(),
            from_name: "Support".to_string(),
            ..Default::default()
        };
        assert_eq!(config.from_header(), "Support <support@example.com>");
    }

    #[test]
    fn test_missing_key_allowed_outside_production() {
        let config = EmailConfig::default();
        assert!(config.validate(Environment::Development).is_ok());
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::MissingRequired("EMAIL__RESEND_API_KEY"))
        );
    }

    #[test]
    fn test_invalid_api_key_prefix() {
        let config = EmailConfig {
            resend_api_key: Some(SecretString::new("sk_xxx".to_string())),
            ..Default::default()
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidResendKey)
        );
    }

    #[test]
    fn test_invalid_from_email() {
        let config = EmailConfig {
            resend_api_key: Some(SecretString::new("re_xxx".to_string())),
            from_email: "invalid-email".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::InvalidFromEmail)
        );
    }
}
