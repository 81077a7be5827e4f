//! Entitlement grants.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{normalize_email, EntitlementId, Timestamp, UserId, ValidationError};

/// Where a grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementSource {
    /// Purchase made on this site.
    Site,
    /// Purchase imported from an external marketplace.
    External,
    /// Granted by an operator.
    Manual,
}

impl EntitlementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementSource::Site => "site",
            EntitlementSource::External => "external",
            EntitlementSource::Manual => "manual",
        }
    }
}

impl fmt::Display for EntitlementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntitlementSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "site" => Ok(EntitlementSource::Site),
            "external" | "ext" => Ok(EntitlementSource::External),
            "manual" => Ok(EntitlementSource::Manual),
            other => Err(format!("unknown entitlement source: {}", other)),
        }
    }
}

/// Access from one email (and optionally an account) to one category.
///
/// Unique on `(email, category, source, discriminator)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub email: String,
    pub account_id: Option<UserId>,
    pub category: String,
    pub source: EntitlementSource,
    pub platform: Option<String>,
    pub order_ref: Option<String>,
    pub claim_code: Option<String>,
    pub granted_at: Timestamp,
}

impl Entitlement {
    /// Grant from a paid site order.
    pub fn site(email: &str, category: &str, order_ref: &str, now: Timestamp) -> Result<Self, ValidationError> {
        let mut grant = Self::base(email, category, EntitlementSource::Site, now)?;
        grant.order_ref = Some(order_ref.to_string());
        Ok(grant)
    }

    /// Grant imported from another sales platform.
    pub fn external(
        email: &str,
        category: &str,
        platform: &str,
        order_ref: &str,
        claim_code: Option<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if platform.trim().is_empty() {
            return Err(ValidationError::empty_field("platform"));
        }
        if order_ref.trim().is_empty() {
            return Err(ValidationError::empty_field("order_ref"));
        }
        let mut grant = Self::base(email, category, EntitlementSource::External, now)?;
        grant.platform = Some(platform.trim().to_lowercase());
        grant.order_ref = Some(order_ref.trim().to_string());
        grant.claim_code = claim_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        Ok(grant)
    }

    pub fn manual(email: &str, category: &str, now: Timestamp) -> Result<Self, ValidationError> {
        Self::base(email, category, EntitlementSource::Manual, now)
    }

    pub fn with_account(mut self, account_id: UserId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Per-source uniqueness key. Site and manual grants are one per
    /// (email, category); external grants are one per platform order.
    pub fn discriminator(&self) -> String {
        match self.source {
            EntitlementSource::External => format!(
                "{}:{}",
                self.platform.as_deref().unwrap_or(""),
                self.order_ref.as_deref().unwrap_or("")
            ),
            EntitlementSource::Site | EntitlementSource::Manual => String::new(),
        }
    }

    fn base(email: &str, category: &str, source: EntitlementSource, now: Timestamp) -> Result<Self, ValidationError> {
        let email = normalize_email(email)
            .ok_or_else(|| ValidationError::invalid_format("email", "not an email address"))?;
        let category = category.trim();
        if category.is_empty() {
            return Err(ValidationError::empty_field("category"));
        }
        Ok(Self {
            id: EntitlementId::new(),
            email,
            account_id: None,
            category: category.to_string(),
            source,
            platform: None,
            order_ref: None,
            claim_code: None,
            granted_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_grants_share_one_slot_per_category() {
        let a = Entitlement::site("A@x.com", "bonus", "TXN-1", Timestamp::now()).unwrap();
        let b = Entitlement::site("a@x.com", "bonus", "TXN-2", Timestamp::now()).unwrap();
        assert_eq!(a.email, b.email);
        assert_eq!(a.discriminator(), b.discriminator());
    }

    #[test]
    fn external_grants_are_keyed_by_platform_order() {
        let a = Entitlement::external("a@x.com", "bonus", "Selar", "S-1", Some(" ab12 ".into()), Timestamp::now())
            .unwrap();
        assert_eq!(a.discriminator(), "selar:S-1");
        assert_eq!(a.claim_code.as_deref(), Some("AB12"));
    }

    #[test]
    fn external_grant_needs_platform_and_reference() {
        assert!(Entitlement::external("a@x.com", "bonus", "", "S-1", None, Timestamp::now()).is_err());
        assert!(Entitlement::external("a@x.com", "bonus", "selar", " ", None, Timestamp::now()).is_err());
    }

    #[test]
    fn invalid_email_is_rejected() {
        assert!(Entitlement::manual("nobody", "bonus", Timestamp::now()).is_err());
    }

    #[test]
    fn source_parses_legacy_label() {
        assert_eq!("EXT".parse::<EntitlementSource>(), Ok(EntitlementSource::External));
    }
}
