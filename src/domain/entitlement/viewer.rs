//! Who is asking, and the access policy applied to them.

use std::collections::HashSet;

use crate::domain::foundation::normalize_email;

use super::catalog::ProtectedCategory;

/// Identity material available on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerContext {
    /// Email of a bearer-authenticated account.
    pub account_email: Option<String>,
    /// Email recorded in the session after a claim or redemption.
    pub session_email: Option<String>,
    /// Claim code recorded in the session.
    pub session_claim_code: Option<String>,
}

/// The single identity an access check is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerIdentity {
    Account(String),
    SessionEmail(String),
    ClaimCode(String),
}

impl ViewerContext {
    /// First usable identity: account, then session email, then claim code.
    ///
    /// Once a higher-priority identity is present the lower ones are never
    /// consulted, even if they would grant access.
    pub fn resolve_identity(&self) -> Option<ViewerIdentity> {
        if let Some(email) = self.account_email.as_deref().and_then(normalize_email) {
            return Some(ViewerIdentity::Account(email));
        }
        if let Some(email) = self.session_email.as_deref().and_then(normalize_email) {
            return Some(ViewerIdentity::SessionEmail(email));
        }
        self.session_claim_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .map(ViewerIdentity::ClaimCode)
    }
}

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Unprotected,
    Entitled,
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    UnknownCategory,
    NoIdentity,
    NoEntitlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(AllowReason),
    Denied(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed(_))
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AccessDecision::Allowed(_) => "Access granted",
            AccessDecision::Denied(DenyReason::UnknownCategory) => "This page does not exist",
            AccessDecision::Denied(DenyReason::NoIdentity) => {
                "Enter the email used for your purchase to unlock this content"
            }
            AccessDecision::Denied(DenyReason::NoEntitlement) => {
                "Payment not yet confirmed for this content"
            }
        }
    }
}

/// Whether `category` needs an entitlement at all.
pub fn requires_entitlement(category: &ProtectedCategory, always_protected: &HashSet<String>) -> bool {
    category.protected || always_protected.contains(&category.slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: &str, protected: bool) -> ProtectedCategory {
        ProtectedCategory {
            slug: slug.to_string(),
            title: slug.to_string(),
            protected,
            required_sku: None,
            files: Vec::new(),
        }
    }

    #[test]
    fn account_email_wins_over_session() {
        let viewer = ViewerContext {
            account_email: Some("Owner@x.com".into()),
            session_email: Some("other@x.com".into()),
            session_claim_code: Some("CODE".into()),
        };
        assert_eq!(
            viewer.resolve_identity(),
            Some(ViewerIdentity::Account("owner@x.com".into()))
        );
    }

    #[test]
    fn session_email_wins_over_claim_code() {
        let viewer = ViewerContext {
            session_email: Some("buyer@x.com".into()),
            session_claim_code: Some("CODE".into()),
            ..Default::default()
        };
        assert_eq!(
            viewer.resolve_identity(),
            Some(ViewerIdentity::SessionEmail("buyer@x.com".into()))
        );
    }

    #[test]
    fn claim_code_is_last_resort() {
        let viewer = ViewerContext {
            session_claim_code: Some(" ab12 ".into()),
            ..Default::default()
        };
        assert_eq!(
            viewer.resolve_identity(),
            Some(ViewerIdentity::ClaimCode("AB12".into()))
        );
    }

    #[test]
    fn garbage_identities_resolve_to_none() {
        let viewer = ViewerContext {
            account_email: Some("not-an-email".into()),
            session_email: Some("".into()),
            session_claim_code: Some("  ".into()),
        };
        assert_eq!(viewer.resolve_identity(), None);
    }

    #[test]
    fn override_set_protects_unflagged_category() {
        let overrides: HashSet<String> = ["bonus".to_string()].into_iter().collect();
        assert!(requires_entitlement(&category("bonus", false), &overrides));
        assert!(requires_entitlement(&category("paid", true), &overrides));
        assert!(!requires_entitlement(&category("free", false), &overrides));
    }
}
