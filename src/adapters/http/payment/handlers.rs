//! HTTP handlers for checkout, provider notifications and the return page.

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::payment::{
    CreateOrderCommand, HandleWebhookCommand, TransitionOutcome, TransitionPaymentCommand,
};
use crate::domain::foundation::StateMachine;
use crate::domain::payment::{PaymentError, Provider};

use super::super::error::ApiError;
use super::super::state::AppState;
use super::dto::{CheckoutRequest, CheckoutResponse, PaymentReturnQuery, PaymentReturnResponse, WebhookAck};

/// Canonical signature header.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Older header names some provider integrations still send.
const DEPRECATED_SIGNATURE_HEADERS: [&str; 2] = ["X-OM-Signature", "X-Token"];

/// Claimed status recorded when the buyer's return triggers the check.
const RETURN_CLAIM: &str = "RETURN";

/// Picks the signature header, warning on deprecated names.
fn signature_header(headers: &HeaderMap) -> Option<String> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(sig) = read(SIGNATURE_HEADER) {
        return Some(sig);
    }
    DEPRECATED_SIGNATURE_HEADERS.iter().find_map(|name| {
        let sig = read(name)?;
        tracing::warn!(header = %name, "Deprecated signature header, use X-Signature");
        Some(sig)
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout - create a PENDING order priced from the catalog
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .create_order_handler()
        .handle(CreateOrderCommand {
            product_sku: request.product_sku,
            email: request.email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(&order))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider notifications
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/:provider - inbound payment notification
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let provider: Provider = provider
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown provider: {}", provider)))?;

    let result = state
        .webhook_handler()
        .handle(HandleWebhookCommand {
            provider,
            raw_body: body.to_vec(),
            header_signature: signature_header(&headers),
        })
        .await?;

    let status = StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::OK);
    Ok((status, Json(WebhookAck { outcome: result.outcome })).into_response())
}

// ════════════════════════════════════════════════════════════════════════════════
// Return page
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payments/return?transaction_id= - where the provider sends the buyer back
///
/// A non-final order is checked with the provider through the same locked
/// transition a webhook uses. A paid order gets its download page URL and
/// the buyer's email goes into the session.
pub async fn payment_return(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PaymentReturnQuery>,
) -> Result<Response, ApiError> {
    let reference = query
        .transaction_id
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("transaction_id is required"))?;

    let mut order = state
        .orders
        .find_by_external_ref(&reference)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if !order.status.is_terminal() {
        let outcome = state
            .transition_handler()
            .handle(TransitionPaymentCommand::new(reference.clone(), RETURN_CLAIM))
            .await;
        match outcome {
            Ok(TransitionOutcome::TransitionedPaid { order: paid, token }) => {
                state.post_payment().start(paid.clone(), token);
                order = paid;
            }
            Ok(TransitionOutcome::TransitionedFailed(current))
            | Ok(TransitionOutcome::AlreadyTerminal(current)) => order = current,
            Ok(TransitionOutcome::UnknownOrder) => {}
            Err(PaymentError::Reconcile(err)) => {
                tracing::warn!(external_ref = %reference, error = %err, "Return page check failed");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !order.is_paid() {
        let body = PaymentReturnResponse {
            transaction_id: reference,
            status: order.status.to_string(),
            message: "Payment not yet confirmed".to_string(),
            download_url: None,
        };
        return Ok(Json(body).into_response());
    }

    let token = state.token_issuer().ensure(&order).await?;
    let body = PaymentReturnResponse {
        transaction_id: reference,
        status: order.status.to_string(),
        message: "Payment confirmed".to_string(),
        download_url: Some(state.link_builder().download_page_url(&order, &token)),
    };
    let session = state.settings.sessions.read(&headers).with_email(order.email.clone());
    let cookie = state.settings.sessions.set_cookie(&session);
    Ok(([cookie], Json(body)).into_response())
}
