//! Delivery errors.

use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Why a signed link was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link expired")]
    Expired,

    #[error("link signature invalid")]
    BadSignature,

    #[error("link malformed")]
    Malformed,
}

impl LinkError {
    pub fn status_code(&self) -> u16 {
        match self {
            LinkError::Expired => 410,
            LinkError::BadSignature | LinkError::Malformed => 403,
        }
    }
}

/// Errors from token issuance and link handling.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("order {0} is not paid")]
    OrderNotPaid(String),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl From<DomainError> for DeliveryError {
    fn from(err: DomainError) -> Self {
        DeliveryError::Infrastructure(err.to_string())
    }
}

impl DeliveryError {
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryError::OrderNotPaid(_) => 403,
            DeliveryError::Link(link) => link.status_code(),
            DeliveryError::Infrastructure(_) => 500,
        }
    }
}

/// Errors from sending the fulfillment email. None of them touch the
/// order's payment status.
#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("order {0} is not paid")]
    OrderNotPaid(String),

    #[error("fulfillment email failed: {0}")]
    Mail(String),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl FulfillmentError {
    pub fn status_code(&self) -> u16 {
        match self {
            FulfillmentError::OrderNotFound(_) => 404,
            FulfillmentError::OrderNotPaid(_) => 403,
            FulfillmentError::Mail(_) => 502,
            FulfillmentError::Infrastructure(_) => 500,
        }
    }
}

impl From<DomainError> for FulfillmentError {
    fn from(err: DomainError) -> Self {
        FulfillmentError::Infrastructure(err.to_string())
    }
}

impl From<DeliveryError> for FulfillmentError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::OrderNotPaid(id) => FulfillmentError::OrderNotPaid(id),
            other => FulfillmentError::Infrastructure(other.to_string()),
        }
    }
}
