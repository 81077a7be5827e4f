//! PostgreSQL implementation of DownloadTokenRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::delivery::{DownloadToken, TokenKind};
use crate::domain::foundation::{DomainError, OrderId, Timestamp, TokenId};
use crate::ports::DownloadTokenRepository;

use super::db_error;

const TOKEN_COLUMNS: &str = "id, order_id, value, kind, expires_at, max_uses, used_count, created_at";

pub struct PostgresDownloadTokenRepository {
    pool: PgPool,
}

impl PostgresDownloadTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    order_id: Uuid,
    value: String,
    kind: String,
    expires_at: DateTime<Utc>,
    max_uses: Option<i32>,
    used_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for DownloadToken {
    type Error = DomainError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind = TokenKind::parse(&row.kind)
            .ok_or_else(|| DomainError::database(format!("Invalid token kind: {}", row.kind)))?;

        Ok(DownloadToken {
            id: TokenId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            value: row.value,
            kind,
            expires_at: Timestamp::from_datetime(row.expires_at),
            max_uses: row.max_uses,
            used_count: row.used_count,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

/// Inserts a token on an existing connection or transaction.
pub(super) async fn insert_token(
    conn: &mut PgConnection,
    token: &DownloadToken,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO download_tokens (
            id, order_id, value, kind, expires_at, max_uses, used_count, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(token.id.as_uuid())
    .bind(token.order_id.as_uuid())
    .bind(&token.value)
    .bind(token.kind.as_str())
    .bind(token.expires_at.as_datetime())
    .bind(token.max_uses)
    .bind(token.used_count)
    .bind(token.created_at.as_datetime())
    .execute(conn)
    .await
    .map_err(db_error("Failed to save download token"))?;

    Ok(())
}

#[async_trait]
impl DownloadTokenRepository for PostgresDownloadTokenRepository {
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        insert_token(&mut conn, token).await
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<DownloadToken>, DomainError> {
        let query = format!("SELECT {} FROM download_tokens WHERE value = $1", TOKEN_COLUMNS);
        let row: Option<TokenRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find download token"))?;

        row.map(DownloadToken::try_from).transpose()
    }

    async fn find_usable_for_order(
        &self,
        order_id: &OrderId,
        kind: TokenKind,
        now: Timestamp,
    ) -> Result<Option<DownloadToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM download_tokens \
             WHERE order_id = $1 AND kind = $2 AND expires_at > $3 \
               AND (max_uses IS NULL OR used_count < max_uses) \
             ORDER BY expires_at DESC LIMIT 1",
            TOKEN_COLUMNS
        );
        let row: Option<TokenRow> = sqlx::query_as(&query)
            .bind(order_id.as_uuid())
            .bind(kind.as_str())
            .bind(now.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find download token"))?;

        row.map(DownloadToken::try_from).transpose()
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM download_tokens WHERE order_id = $1 ORDER BY created_at ASC",
            TOKEN_COLUMNS
        );
        let rows: Vec<TokenRow> = sqlx::query_as(&query)
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list download tokens"))?;

        rows.into_iter().map(DownloadToken::try_from).collect()
    }

    async fn try_consume(&self, value: &str, now: Timestamp) -> Result<Option<DownloadToken>, DomainError> {
        let query = format!(
            "UPDATE download_tokens SET used_count = used_count + 1 \
             WHERE value = $1 AND kind = 'consumable' AND expires_at > $2 \
               AND (max_uses IS NULL OR used_count < max_uses) \
             RETURNING {}",
            TOKEN_COLUMNS
        );
        let row: Option<TokenRow> = sqlx::query_as(&query)
            .bind(value)
            .bind(now.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to consume download token"))?;

        row.map(DownloadToken::try_from).transpose()
    }
}
