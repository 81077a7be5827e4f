//! EntitlementRepository port.
//!
//! Uniqueness of `(email, category, source, discriminator)` is enforced by
//! the store; granting an existing entitlement is a no-op.

use async_trait::async_trait;

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Returns true if a new row was written.
    async fn grant(&self, entitlement: &Entitlement) -> Result<bool, DomainError>;

    /// Any entitlement, of any source, for this email and category.
    async fn exists_for_email(&self, email: &str, category: &str) -> Result<bool, DomainError>;

    /// Any imported entitlement carrying this claim code for the category.
    async fn exists_for_claim_code(&self, claim_code: &str, category: &str) -> Result<bool, DomainError>;

    /// Distinct categories this email is entitled to.
    async fn categories_for_email(&self, email: &str) -> Result<Vec<String>, DomainError>;
}
