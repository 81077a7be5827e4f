//! Error bodies and the conversion from application errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::delivery::{DeliveryError, FulfillmentError, LinkError};
use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentError;

/// Standard error response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// API error carrying its status, code and message.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, "GONE", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Internal failures keep their detail in the log, never in the body.
    fn from_status(status: u16, code: &str, message: String) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code, error = %message, "Request failed");
            let mut err = Self::internal();
            err.status = status;
            return err;
        }
        Self::new(status, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::from_status(500, "INTERNAL_ERROR", err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self::from_status(err.status_code(), err.code(), err.to_string())
    }
}

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        Self::from_status(err.status_code(), err.code(), err.to_string())
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        let code = match err {
            LinkError::Expired => "LINK_EXPIRED",
            LinkError::BadSignature | LinkError::Malformed => "LINK_INVALID",
        };
        Self::from_status(err.status_code(), code, err.to_string())
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Link(link) => link.into(),
            DeliveryError::OrderNotPaid(_) => Self::from_status(
                err.status_code(),
                "PAYMENT_NOT_CONFIRMED",
                err.to_string(),
            ),
            DeliveryError::Infrastructure(_) => {
                Self::from_status(err.status_code(), "INTERNAL_ERROR", err.to_string())
            }
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        let code = match err {
            FulfillmentError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            FulfillmentError::OrderNotPaid(_) => "PAYMENT_NOT_CONFIRMED",
            FulfillmentError::Mail(_) => "DELIVERY_FAILED",
            FulfillmentError::Infrastructure(_) => "INTERNAL_ERROR",
        };
        let status = err.status_code();
        if let FulfillmentError::Mail(detail) = &err {
            tracing::error!(error = %detail, "Fulfillment email failed");
            return Self::new(
                StatusCode::BAD_GATEWAY,
                code,
                "The email could not be sent; try again later",
            );
        }
        Self::from_status(status, code, err.to_string())
    }
}
