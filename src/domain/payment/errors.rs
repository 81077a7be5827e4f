//! Payment pipeline errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, TransitionError};

use super::reconcile::ReconcileError;
use super::status::OrderStatus;

/// Errors raised while moving an order through its lifecycle.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("invalid order transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {0} is not paid")]
    NotPaid(String),

    #[error("no order for reference {0}")]
    UnknownOrder(String),

    #[error("unknown product {0}")]
    UnknownProduct(String),

    #[error("invalid order data: {0}")]
    Validation(String),

    #[error("provider check failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl PaymentError {
    /// HTTP status for handlers that surface this error directly.
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::InvalidTransition { .. } => 409,
            PaymentError::NotPaid(_) => 403,
            PaymentError::UnknownOrder(_) | PaymentError::UnknownProduct(_) => 404,
            PaymentError::Validation(_) => 400,
            PaymentError::Reconcile(_) => 502,
            PaymentError::Infrastructure(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            PaymentError::NotPaid(_) => "PAYMENT_NOT_CONFIRMED",
            PaymentError::UnknownOrder(_) => "ORDER_NOT_FOUND",
            PaymentError::UnknownProduct(_) => "PRODUCT_NOT_FOUND",
            PaymentError::Validation(_) => "VALIDATION_FAILED",
            PaymentError::Reconcile(_) => "PROVIDER_CHECK_FAILED",
            PaymentError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<TransitionError<OrderStatus>> for PaymentError {
    fn from(err: TransitionError<OrderStatus>) -> Self {
        PaymentError::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::OrderNotFound => PaymentError::UnknownOrder(err.message),
            ErrorCode::ProductNotFound => PaymentError::UnknownProduct(err.message),
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                PaymentError::Validation(err.message)
            }
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_errors_map_to_bad_gateway() {
        let err: PaymentError = ReconcileError::Timeout.into();
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.code(), "PROVIDER_CHECK_FAILED");
    }

    #[test]
    fn database_errors_become_infrastructure() {
        let err: PaymentError = DomainError::database("connection reset").into();
        assert!(matches!(err, PaymentError::Infrastructure(_)));
        assert_eq!(err.status_code(), 500);
    }
}
