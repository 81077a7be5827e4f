//! HTTP handlers for gated category pages and entitlement claims.

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::entitlement::{ClaimEntitlementCommand, ClaimOutcome};
use crate::domain::entitlement::{AccessDecision, AllowReason, DenyReason, ViewerContext};
use crate::domain::foundation::Timestamp;

use super::super::error::ApiError;
use super::super::middleware::{protect_response, OptionalAuth};
use super::super::session::SessionData;
use super::super::state::AppState;
use super::dto::{CategoryFile, CategoryResponse, ClaimRequest, ClaimResponse};

/// Maps a refusal to its HTTP error.
fn denied(decision: AccessDecision) -> ApiError {
    match decision {
        AccessDecision::Denied(DenyReason::UnknownCategory) => {
            ApiError::not_found(decision.user_message())
        }
        _ => ApiError::new(
            StatusCode::FORBIDDEN,
            "ENTITLEMENT_REQUIRED",
            decision.user_message(),
        ),
    }
}

/// GET /downloads/categories/:slug - gated category listing
///
/// Identity is the bearer account if any, otherwise the session. Responses
/// for protected categories, and every refusal, carry no-store and noindex
/// headers.
pub async fn category_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let session = state.settings.sessions.read(&headers);
    let viewer = ViewerContext {
        account_email: user.map(|u| u.email),
        session_email: session.verified_email,
        session_claim_code: session.claim_code,
    };

    let gate = state.entitlement_gate();
    let decision = gate.check(&viewer, &slug).await?;

    let mut response = match (decision, state.catalog.category(&slug)) {
        (AccessDecision::Allowed(_), Some(category)) => {
            let now = Timestamp::now();
            let links = state.link_builder();
            let files = category
                .files
                .iter()
                .map(|path| CategoryFile {
                    name: path.rsplit('/').next().unwrap_or(path).to_string(),
                    url: links.file_url(path, now),
                })
                .collect();
            Json(CategoryResponse {
                slug: category.slug.clone(),
                title: category.title.clone(),
                files,
            })
            .into_response()
        }
        (decision, _) => {
            tracing::info!(category = %slug, decision = ?decision, "Category access refused");
            denied(decision).into_response()
        }
    };

    if !decision.is_allowed() || gate.is_protected(&slug) {
        protect_response(&mut response);
    }
    Ok(response)
}

/// POST /claims - "I bought this" form
///
/// 200 and a session update when a purchase (or an imported claim code)
/// matches, 202 when the claim goes to manual review.
pub async fn submit_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClaimRequest>,
) -> Result<Response, ApiError> {
    let session = state.settings.sessions.read(&headers);
    let email = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    if let Some(email) = email {
        let outcome = state
            .claim_handler()
            .handle(ClaimEntitlementCommand {
                email: email.to_string(),
                target: request.category,
            })
            .await?;
        return Ok(match outcome {
            ClaimOutcome::Granted {
                email, categories, ..
            } => {
                let cookie = state.settings.sessions.set_cookie(&session.with_email(email));
                ([cookie], Json(ClaimResponse::granted(categories))).into_response()
            }
            ClaimOutcome::ManualReview { .. } => {
                (StatusCode::ACCEPTED, Json(ClaimResponse::manual_review())).into_response()
            }
        });
    }

    let code = request
        .claim_code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("email or claim_code is required"))?;
    let viewer = ViewerContext {
        session_claim_code: Some(code.clone()),
        ..ViewerContext::default()
    };
    match state.entitlement_gate().check(&viewer, &request.category).await? {
        AccessDecision::Allowed(AllowReason::Entitled) => {
            let session = SessionData {
                claim_code: Some(code),
                ..session
            };
            let cookie = state.settings.sessions.set_cookie(&session);
            let body = ClaimResponse::granted(vec![request.category]);
            Ok(([cookie], Json(body)).into_response())
        }
        decision @ AccessDecision::Denied(DenyReason::UnknownCategory) => Err(denied(decision)),
        _ => Ok((StatusCode::ACCEPTED, Json(ClaimResponse::manual_review())).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_is_not_found_and_others_forbidden() {
        assert_eq!(
            denied(AccessDecision::Denied(DenyReason::UnknownCategory)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            denied(AccessDecision::Denied(DenyReason::NoIdentity)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            denied(AccessDecision::Denied(DenyReason::NoEntitlement)).status(),
            StatusCode::FORBIDDEN
        );
    }
}
