//! PostgreSQL implementation of EntitlementRepository.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::DomainError;
use crate::ports::EntitlementRepository;

use super::db_error;

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Inserts unless an equivalent grant exists. Returns true if a row was written.
pub(super) async fn insert_entitlement(
    conn: &mut PgConnection,
    entitlement: &Entitlement,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO entitlements (
            id, email, account_id, category, source, platform, order_ref,
            claim_code, discriminator, granted_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (email, category, source, discriminator) DO NOTHING
        "#,
    )
    .bind(entitlement.id.as_uuid())
    .bind(&entitlement.email)
    .bind(entitlement.account_id.as_ref().map(|id| id.as_str()))
    .bind(&entitlement.category)
    .bind(entitlement.source.as_str())
    .bind(&entitlement.platform)
    .bind(&entitlement.order_ref)
    .bind(&entitlement.claim_code)
    .bind(entitlement.discriminator())
    .bind(entitlement.granted_at.as_datetime())
    .execute(conn)
    .await
    .map_err(db_error("Failed to save entitlement"))?;

    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn grant(&self, entitlement: &Entitlement) -> Result<bool, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        insert_entitlement(&mut conn, entitlement).await
    }

    async fn exists_for_email(&self, email: &str, category: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM entitlements WHERE email = $1 AND category = $2)",
        )
        .bind(email)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check entitlement"))?;

        Ok(exists)
    }

    async fn exists_for_claim_code(&self, claim_code: &str, category: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM entitlements WHERE claim_code = $1 AND category = $2)",
        )
        .bind(claim_code)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check entitlement"))?;

        Ok(exists)
    }

    async fn categories_for_email(&self, email: &str) -> Result<Vec<String>, DomainError> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM entitlements WHERE email = $1 ORDER BY category",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list entitlements"))?;

        Ok(categories)
    }
}
