//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Payment configuration (webhook secret and CinetPay check credentials)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Shared secret for webhook HMAC signatures
    pub webhook_secret: SecretString,

    /// CinetPay API key used by the server-to-server check
    pub cinetpay_api_key: Option<SecretString>,

    /// CinetPay site identifier
    pub cinetpay_site_id: Option<String>,

    /// Transaction check endpoint
    #[serde(default = "default_check_url")]
    pub check_url: String,

    /// Timeout for the whole check request, in seconds
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    /// Allow the deterministic "accepted" reconciler when credentials are absent
    #[serde(default)]
    pub allow_dev_stub: bool,
}

/// Which reconciler the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerMode {
    Live,
    DevStub,
}

impl PaymentConfig {
    /// Credentials for the live check, if both halves are present and non-empty.
    pub fn credentials(&self) -> Option<(&SecretString, &str)> {
        let key = self
            .cinetpay_api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())?;
        let site = self
            .cinetpay_site_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((key, site))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Decide between the live reconciler and the development stub.
    ///
    /// Present credentials always win. The stub needs an explicit opt-in and
    /// is refused in production.
    pub fn reconciler_mode(&self, environment: Environment) -> Result<ReconcilerMode, ValidationError> {
        if self.credentials().is_some() {
            return Ok(ReconcilerMode::Live);
        }
        if !self.allow_dev_stub {
            return Err(ValidationError::NoReconcilerAvailable);
        }
        if environment == Environment::Production {
            return Err(ValidationError::DevStubInProduction);
        }
        Ok(ReconcilerMode::DevStub)
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__WEBHOOK_SECRET"));
        }
        let has_key = self
            .cinetpay_api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty());
        let has_site = self
            .cinetpay_site_id
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if has_key != has_site {
            return Err(ValidationError::PartialProviderCredentials);
        }
        if self.check_timeout_secs == 0 || self.check_timeout_secs > 60 {
            return Err(ValidationError::InvalidCheckTimeout);
        }
        if self.allow_dev_stub && environment == Environment::Production {
            return Err(ValidationError::DevStubInProduction);
        }
        self.reconciler_mode(environment)?;
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_secret: SecretString::new(String::new()),
            cinetpay_api_key: None,
            cinetpay_site_id: None,
            check_url: default_check_url(),
            check_timeout_secs: default_check_timeout(),
            allow_dev_stub: false,
        }
    }
}

fn default_check_url() -> String {
    "https://api-checkout.cinetpay.com/v2/payment/check".to_string()
}

fn default_check_timeout() -> u64 {
    25
}
