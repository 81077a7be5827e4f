//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PAYGATE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use paygate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod delivery;
mod email;
mod error;
mod payment;
mod server;
mod sweep;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use delivery::DeliveryConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::{PaymentConfig, ReconcilerMode};
pub use server::{Environment, ServerConfig};
pub use sweep::SweepConfig;

use serde::Deserialize;

/// How much longer than a provider check a row-lock waiter must be willing to wait.
pub const LOCK_TIMEOUT_MARGIN_MS: u64 = 5_000;

/// Root application configuration
///
/// Built once at start-up and handed to each component.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Webhook secret and provider credentials
    pub payment: PaymentConfig,

    /// Email configuration (Resend)
    #[serde(default)]
    pub email: EmailConfig,

    /// Bearer token validation
    pub auth: AuthConfig,

    /// Tokens, signed links, catalog
    pub delivery: DeliveryConfig,

    /// Stale PENDING sweep
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PAYGATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYGATE__PAYMENT__WEBHOOK_SECRET=...` -> `payment.webhook_secret = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYGATE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let environment = self.server.environment;
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(environment)?;
        // A waiter on the order row must outlast the holder's provider check.
        if self.database.lock_timeout_ms
            <= self.payment.check_timeout_secs * 1_000 + LOCK_TIMEOUT_MARGIN_MS
        {
            return Err(ValidationError::LockTimeoutTooShort(LOCK_TIMEOUT_MARGIN_MS));
        }
        self.email.validate(environment)?;
        self.auth.validate()?;
        self.delivery.validate()?;
        if self.sweep.enabled {
            self.sweep.validate()?;
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const SECRET_32: &str = "0123456789abcdef0123456789abcdef";

    fn set_minimal_env() {
        env::set_var("PAYGATE__DATABASE__URL", "postgresql://test@localhost/shop");
        env::set_var("PAYGATE__PAYMENT__WEBHOOK_SECRET", "whsec-test");
        env::set_var("PAYGATE__PAYMENT__ALLOW_DEV_STUB", "true");
        env::set_var("PAYGATE__AUTH__JWT_SECRET", SECRET_32);
        env::set_var("PAYGATE__DELIVERY__SIGNING_SECRET", SECRET_32);
        env::set_var("PAYGATE__DELIVERY__SESSION_SECRET", SECRET_32);
    }

    fn clear_env() {
        for key in [
            "PAYGATE__DATABASE__URL",
            "PAYGATE__PAYMENT__WEBHOOK_SECRET",
            "PAYGATE__PAYMENT__ALLOW_DEV_STUB",
            "PAYGATE__PAYMENT__CINETPAY_API_KEY",
            "PAYGATE__PAYMENT__CINETPAY_SITE_ID",
            "PAYGATE__AUTH__JWT_SECRET",
            "PAYGATE__DELIVERY__SIGNING_SECRET",
            "PAYGATE__DELIVERY__SESSION_SECRET",
            "PAYGATE__SERVER__PORT",
            "PAYGATE__SERVER__ENVIRONMENT",
            "PAYGATE__DATABASE__LOCK_TIMEOUT_MS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/shop");
        assert_eq!(config.payment.webhook_secret.expose_secret(), "whsec-test");
        assert!(config.payment.allow_dev_stub);
        assert_eq!(config.delivery.token_ttl_hours, 72);
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.payment.reconciler_mode(config.server.environment),
            Ok(ReconcilerMode::DevStub)
        );
    }

    #[test]
    fn test_production_rejects_dev_stub() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYGATE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_switch_to_live_mode() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYGATE__PAYMENT__CINETPAY_API_KEY", "key");
        env::set_var("PAYGATE__PAYMENT__CINETPAY_SITE_ID", "site");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.payment.reconciler_mode(config.server.environment),
            Ok(ReconcilerMode::Live)
        );
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYGATE__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_lock_timeout_must_outlast_provider_check() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYGATE__DATABASE__LOCK_TIMEOUT_MS", "5000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.payment.check_timeout_secs, 25);
        assert_eq!(
            config.validate(),
            Err(ValidationError::LockTimeoutTooShort(LOCK_TIMEOUT_MARGIN_MS))
        );
    }
}
