//! Entitlement errors.

use thiserror::Error;

use crate::domain::foundation::DomainError;

#[derive(Debug, Clone, Error)]
pub enum EntitlementError {
    #[error("not an email address")]
    InvalidEmail,

    #[error("unknown category or product {0}")]
    UnknownCategory(String),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EntitlementError {
    pub fn status_code(&self) -> u16 {
        match self {
            EntitlementError::InvalidEmail => 400,
            EntitlementError::UnknownCategory(_) => 404,
            EntitlementError::Infrastructure(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EntitlementError::InvalidEmail => "INVALID_FORMAT",
            EntitlementError::UnknownCategory(_) => "CATEGORY_NOT_FOUND",
            EntitlementError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        EntitlementError::Infrastructure(err.to_string())
    }
}
