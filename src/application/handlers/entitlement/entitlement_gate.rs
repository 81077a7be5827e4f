//! EntitlementGate - may this viewer see this content category?

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entitlement::{
    requires_entitlement, AccessDecision, AllowReason, Catalog, DenyReason, EntitlementError,
    ViewerContext, ViewerIdentity,
};
use crate::ports::EntitlementRepository;

/// Evaluates access for one identity, chosen by priority: account email,
/// then session email, then session claim code. Lower-priority identities
/// are never tried once a higher one resolves.
pub struct EntitlementGate {
    catalog: Arc<Catalog>,
    entitlements: Arc<dyn EntitlementRepository>,
    always_protected: HashSet<String>,
}

impl EntitlementGate {
    pub fn new(
        catalog: Arc<Catalog>,
        entitlements: Arc<dyn EntitlementRepository>,
        always_protected: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            catalog,
            entitlements,
            always_protected: always_protected.into_iter().collect(),
        }
    }

    /// Whether the category's responses must not be cached or indexed.
    pub fn is_protected(&self, category_slug: &str) -> bool {
        self.catalog
            .category(category_slug)
            .map(|c| requires_entitlement(c, &self.always_protected))
            .unwrap_or(false)
    }

    pub async fn check(
        &self,
        viewer: &ViewerContext,
        category_slug: &str,
    ) -> Result<AccessDecision, EntitlementError> {
        let Some(category) = self.catalog.category(category_slug) else {
            return Ok(AccessDecision::Denied(DenyReason::UnknownCategory));
        };
        if !requires_entitlement(category, &self.always_protected) {
            return Ok(AccessDecision::Allowed(AllowReason::Unprotected));
        }

        let Some(identity) = viewer.resolve_identity() else {
            return Ok(AccessDecision::Denied(DenyReason::NoIdentity));
        };
        let entitled = match &identity {
            ViewerIdentity::Account(email) | ViewerIdentity::SessionEmail(email) => {
                self.entitlements.exists_for_email(email, &category.slug).await?
            }
            ViewerIdentity::ClaimCode(code) => {
                self.entitlements
                    .exists_for_claim_code(code, &category.slug)
                    .await?
            }
        };

        tracing::debug!(category = %category.slug, identity = ?identity, entitled, "Access check");
        Ok(if entitled {
            AccessDecision::Allowed(AllowReason::Entitled)
        } else {
            AccessDecision::Denied(DenyReason::NoEntitlement)
        })
    }

    pub async fn has_access(
        &self,
        viewer: &ViewerContext,
        category_slug: &str,
    ) -> Result<bool, EntitlementError> {
        Ok(self.check(viewer, category_slug).await?.is_allowed())
    }
}
