//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("Catalog could not be read: {0}")]
    CatalogUnreadable(String),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Provider credentials must be set together (api_key and site_id)")]
    PartialProviderCredentials,

    #[error("Provider check timeout must be between 1 and 60 seconds")]
    InvalidCheckTimeout,

    #[error("Database lock timeout must exceed the provider check timeout by at least {0} ms")]
    LockTimeoutTooShort(u64),

    #[error("The development reconciler stub cannot be enabled in production")]
    DevStubInProduction,

    #[error("Provider credentials are required when the development stub is disabled")]
    NoReconcilerAvailable,

    #[error("Invalid Resend API key format")]
    InvalidResendKey,

    #[error("Invalid from email address")]
    InvalidFromEmail,

    #[error("Signing secret must be at least 32 bytes")]
    WeakSigningSecret,

    #[error("Invalid token lifetime: {0}")]
    InvalidTokenLifetime(&'static str),

    #[error("Invalid sweep setting: {0}")]
    InvalidSweep(&'static str),

    #[error("Public base URL must use HTTPS in production")]
    BaseUrlMustBeHttps,
}
