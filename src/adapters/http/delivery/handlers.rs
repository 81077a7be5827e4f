//! HTTP handlers for token redemption, signed files, deliveries, resend and bonus links.

use axum::extract::{Json, Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::domain::delivery::{LinkError, Redemption};
use crate::domain::foundation::{OrderId, Timestamp};

use super::super::error::ApiError;
use super::super::middleware::{protect_response, RequireAuth};
use super::super::state::AppState;
use super::dto::{
    AcceptedResponse, BonusQuery, BonusResponse, DeliveryQuery, DownloadPageResponse,
    OperatorResendResponse, ResendRequest, SignedFileQuery,
};

/// Internal location the front proxy serves protected files from.
pub const PROTECTED_LOCATION: &str = "/protected/";

static X_ACCEL_REDIRECT: HeaderName = HeaderName::from_static("x-accel-redirect");

/// Hands the actual file transfer to the front proxy.
fn accel_redirect(path: &str) -> Result<Response, ApiError> {
    let path = path.trim_start_matches('/');
    let location = HeaderValue::from_str(&format!("{}{}", PROTECTED_LOCATION, path))
        .map_err(|_| ApiError::from(LinkError::Malformed))?;
    let filename = path.rsplit('/').next().unwrap_or(path).replace('"', "");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(X_ACCEL_REDIRECT.clone(), location);
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, private"));
    Ok(response)
}

/// Error for a token that did not redeem.
fn refused(redemption: &Redemption) -> ApiError {
    match redemption {
        Redemption::Expired => ApiError::gone("This link has expired; ask for a new one"),
        Redemption::NotFound => ApiError::not_found("Unknown link"),
        Redemption::Invalid | Redemption::Redeemed { .. } => ApiError::forbidden("Invalid link"),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Download page
// ════════════════════════════════════════════════════════════════════════════════

/// GET /downloads/orders/:order_id/:token - the buyer's download page
///
/// 200 with fresh signed links, 403 for an invalid token, 404 for an unknown
/// one, 410 once it has expired. A redeemed token proves the buyer's email,
/// which goes into the session.
pub async fn download_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((order_id, token)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| ApiError::not_found("Unknown link"))?;

    let issuer = state.token_issuer();
    let (order, token) = match issuer.redeem_for_order(&order_id, &token).await? {
        Redemption::Redeemed { order, token } => (order, token),
        other => {
            let mut response = refused(&other).into_response();
            protect_response(&mut response);
            return Ok(response);
        }
    };

    let links = state
        .fulfillment()
        .links_for(&order, &token, Timestamp::now())
        .await?;
    let one_shot = issuer.ensure_consumable(&order).await?;

    let body = DownloadPageResponse::new(
        order.id.to_string(),
        order.external_ref.clone(),
        links,
        state.link_builder().delivery_url(&one_shot),
        token.expires_at.as_datetime().to_rfc3339(),
    );
    let session = state.settings.sessions.read(&headers).with_email(order.email.clone());
    let cookie = state.settings.sessions.set_cookie(&session);

    let mut response = ([cookie], Json(body)).into_response();
    protect_response(&mut response);
    Ok(response)
}

// ════════════════════════════════════════════════════════════════════════════════
// Files and deliveries
// ════════════════════════════════════════════════════════════════════════════════

/// GET /files/*path?expires=&sig= - short-lived signed file URL
pub async fn signed_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, ApiError> {
    let (Some(expires), Some(sig)) = (query.expires, query.sig) else {
        return Err(LinkError::Malformed.into());
    };
    if let Err(err) = state
        .settings
        .files
        .verify(&path, expires, &sig, Timestamp::now())
    {
        tracing::info!(path = %path, error = %err, "Signed file URL refused");
        return Err(err.into());
    }
    accel_redirect(&path)
}

/// GET /deliveries/:token?variant= - one-shot document delivery
///
/// Each successful call spends one use of the token.
pub async fn consume_delivery(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Result<Response, ApiError> {
    let order = match state.token_issuer().consume(&token).await? {
        Redemption::Redeemed { order, .. } => order,
        other => return Err(refused(&other)),
    };

    let variants = state
        .catalog
        .product(&order.product_sku)
        .map(|p| p.variants.as_slice())
        .unwrap_or_default();
    let variant = match query.variant.as_deref() {
        Some(label) => variants.iter().find(|v| v.label.eq_ignore_ascii_case(label.trim())),
        None => variants.first(),
    }
    .ok_or_else(|| ApiError::not_found("No such document variant"))?;

    tracing::info!(order_id = %order.id, variant = %variant.label, "One-shot delivery served");
    accel_redirect(&variant.path)
}

// ════════════════════════════════════════════════════════════════════════════════
// Resend
// ════════════════════════════════════════════════════════════════════════════════

/// POST /orders/resend - self-service resend by email
///
/// Always 202: the answer never reveals whether the email bought anything.
pub async fn resend_by_email(
    State(state): State<AppState>,
    Json(request): Json<ResendRequest>,
) -> impl IntoResponse {
    if let Err(err) = state.resend_handler().by_email(&request.email).await {
        tracing::error!(error = %err, "Self-service resend failed");
    }
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            message: "If a paid order matches this email, its links are on the way".to_string(),
        }),
    )
}

/// POST /operator/orders/:order_id/resend - operator resend, reports the real result
pub async fn operator_resend(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.settings.is_operator(&user.email) {
        tracing::warn!(account = %user.id, "Operator action refused");
        return Err(ApiError::forbidden("Operator access required"));
    }
    let order_id: OrderId = order_id
        .parse()
        .map_err(|_| ApiError::not_found("Order not found"))?;

    state.resend_handler().by_order(&order_id).await?;

    tracing::info!(order_id = %order_id, operator = %user.email, "Operator resend");
    Ok(Json(OperatorResendResponse {
        order_id: order_id.to_string(),
        status: "sent".to_string(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Bonus
// ════════════════════════════════════════════════════════════════════════════════

/// GET /bonus/kit-preparation/start?product_slug=&token= - bonus link landing
pub async fn bonus_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BonusQuery>,
) -> Result<Response, ApiError> {
    if let Some(slug) = query.product_slug.as_deref() {
        if state.catalog.product_by_slug(slug).is_none() {
            return Err(ApiError::not_found("Unknown product"));
        }
    }
    let token = query.token.ok_or(LinkError::Malformed)?;
    let claim = state.settings.bonus.verify(&token, Timestamp::now())?;

    let session = state.settings.sessions.read(&headers).with_email(claim.email.clone());
    let cookie = state.settings.sessions.set_cookie(&session);
    let body = BonusResponse {
        product_slug: query.product_slug,
        email: claim.email,
        transaction_id: claim.order_ref,
    };

    let mut response = ([cookie], Json(body)).into_response();
    protect_response(&mut response);
    Ok(response)
}
