//! Delivery configuration: token lifetimes, signing secrets, catalog

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Token, signed-link and session settings
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Secret for signed file URLs and bonus links
    pub signing_secret: SecretString,

    /// Secret for the session cookie
    pub session_secret: SecretString,

    /// Lifetime of download tokens, in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Lifetime of signed file URLs, in minutes
    #[serde(default = "default_signed_url_ttl_minutes")]
    pub signed_url_ttl_minutes: i64,

    /// Lifetime of one-shot delivery tokens, in minutes
    #[serde(default = "default_consumable_ttl_minutes")]
    pub consumable_ttl_minutes: i64,

    /// Use ceiling of one-shot delivery tokens
    #[serde(default = "default_consumable_max_uses")]
    pub consumable_max_uses: i32,

    /// Lifetime of the bonus claim link, in days
    #[serde(default = "default_bonus_ttl_days")]
    pub bonus_ttl_days: i64,

    /// YAML catalog of products and categories; the built-in catalog is used when unset
    pub catalog_path: Option<String>,

    /// Categories gated regardless of their catalog flag (comma-separated slugs)
    #[serde(default = "default_always_protected")]
    pub always_protected: String,
}

impl DeliveryConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::hours(self.token_ttl_hours)
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::minutes(self.signed_url_ttl_minutes)
    }

    pub fn consumable_ttl(&self) -> Duration {
        Duration::minutes(self.consumable_ttl_minutes)
    }

    pub fn bonus_ttl(&self) -> Duration {
        Duration::days(self.bonus_ttl_days)
    }

    pub fn always_protected_list(&self) -> Vec<String> {
        self.always_protected
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validate delivery configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signing_secret.expose_secret().len() < 32 {
            return Err(ValidationError::WeakSigningSecret);
        }
        if self.session_secret.expose_secret().len() < 32 {
            return Err(ValidationError::WeakSigningSecret);
        }
        if !(1..=24 * 30).contains(&self.token_ttl_hours) {
            return Err(ValidationError::InvalidTokenLifetime("token_ttl_hours"));
        }
        if !(1..=120).contains(&self.signed_url_ttl_minutes) {
            return Err(ValidationError::InvalidTokenLifetime("signed_url_ttl_minutes"));
        }
        if !(1..=24 * 60).contains(&self.consumable_ttl_minutes) {
            return Err(ValidationError::InvalidTokenLifetime("consumable_ttl_minutes"));
        }
        if self.consumable_max_uses < 1 {
            return Err(ValidationError::InvalidTokenLifetime("consumable_max_uses"));
        }
        if !(1..=90).contains(&self.bonus_ttl_days) {
            return Err(ValidationError::InvalidTokenLifetime("bonus_ttl_days"));
        }
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            signing_secret: SecretString::new(String::new()),
            session_secret: SecretString::new(String::new()),
            token_ttl_hours: default_token_ttl_hours(),
            signed_url_ttl_minutes: default_signed_url_ttl_minutes(),
            consumable_ttl_minutes: default_consumable_ttl_minutes(),
            consumable_max_uses: default_consumable_max_uses(),
            bonus_ttl_days: default_bonus_ttl_days(),
            catalog_path: None,
            always_protected: default_always_protected(),
        }
    }
}

fn default_token_ttl_hours() -> i64 {
    72
}

fn default_signed_url_ttl_minutes() -> i64 {
    15
}

fn default_consumable_ttl_minutes() -> i64 {
    45
}

fn default_consumable_max_uses() -> i32 {
    1
}

fn default_bonus_ttl_days() -> i64 {
    7
}

fn default_always_protected() -> String {
    "bonus,checklists,outils-pratiques,irregularites".to_string()
}
