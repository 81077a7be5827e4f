//! ClaimEntitlementHandler - "I bought this, here is my email".
//!
//! A claim succeeds only against a paid site order for the same email whose
//! product unlocks the requested category. Anything else goes to manual
//! review, which happens outside this service.

use std::sync::Arc;

use crate::domain::entitlement::{Catalog, Entitlement, EntitlementError};
use crate::domain::foundation::{normalize_email, Timestamp};
use crate::domain::payment::Order;
use crate::ports::{EntitlementRepository, OrderRepository};

#[derive(Debug, Clone)]
pub struct ClaimEntitlementCommand {
    pub email: String,
    /// A category slug or a product SKU.
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// A matching purchase was found; the email may now be put in the session.
    Granted {
        email: String,
        external_ref: String,
        categories: Vec<String>,
    },
    ManualReview { email: String },
}

#[derive(Debug)]
enum ClaimTarget {
    Product(String),
    Category(String),
}

impl ClaimTarget {
    fn matches(&self, catalog: &Catalog, order: &Order) -> bool {
        match self {
            ClaimTarget::Product(sku) => order.product_sku == *sku,
            ClaimTarget::Category(slug) => catalog
                .categories_granted_by(&order.product_sku)
                .iter()
                .any(|c| c.slug == *slug),
        }
    }
}

pub struct ClaimEntitlementHandler {
    orders: Arc<dyn OrderRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    catalog: Arc<Catalog>,
}

impl ClaimEntitlementHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            orders,
            entitlements,
            catalog,
        }
    }

    pub async fn handle(&self, cmd: ClaimEntitlementCommand) -> Result<ClaimOutcome, EntitlementError> {
        let email = normalize_email(&cmd.email).ok_or(EntitlementError::InvalidEmail)?;
        let target = cmd.target.trim();

        let target = if self.catalog.product(target).is_some() {
            ClaimTarget::Product(target.to_string())
        } else if self.catalog.category(target).is_some() {
            ClaimTarget::Category(target.to_string())
        } else {
            return Err(EntitlementError::UnknownCategory(target.to_string()));
        };

        let paid = self.orders.find_paid_by_email(&email).await?;
        let Some(order) = paid.iter().find(|o| target.matches(&self.catalog, o)) else {
            tracing::info!(claim_target = ?target, "No matching purchase, claim sent to manual review");
            return Ok(ClaimOutcome::ManualReview { email });
        };

        let now = Timestamp::now();
        let mut categories = Vec::new();
        for category in self.catalog.categories_granted_by(&order.product_sku) {
            let grant = Entitlement::site(&email, &category.slug, &order.external_ref, now)
                .map_err(|e| EntitlementError::Infrastructure(e.to_string()))?;
            self.entitlements.grant(&grant).await?;
            categories.push(category.slug.clone());
        }

        tracing::info!(
            external_ref = %order.external_ref,
            categories = categories.len(),
            "Claim matched a site purchase"
        );
        Ok(ClaimOutcome::Granted {
            email,
            external_ref: order.external_ref.clone(),
            categories,
        })
    }
}
