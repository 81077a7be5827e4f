//! PostgreSQL implementation of OrderRepository.
//!
//! The locked transition holds a transaction with `SELECT ... FOR UPDATE` on
//! the order row, so concurrent notifications for one reference serialize on
//! the row lock. `lock_timeout` bounds how long a waiter blocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp};
use crate::domain::payment::{Order, OrderStatus};
use crate::ports::{LockedOrder, OrderChanges, OrderRepository};

use super::download_token_repository::insert_token;
use super::entitlement_repository::insert_entitlement;
use super::db_error;

const ORDER_COLUMNS: &str = "id, product_sku, email, amount, currency, external_ref, status, \
     provider_transaction_id, created_at, paid_at, delivered_at";

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    product_sku: String,
    email: String,
    amount: i64,
    currency: String,
    external_ref: String,
    status: String,
    provider_transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: String| DomainError::database(format!("Invalid order status: {}", e)))?;

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            product_sku: row.product_sku,
            email: row.email,
            amount: row.amount,
            currency: row.currency,
            external_ref: row.external_ref,
            status,
            provider_transaction_id: row.provider_transaction_id,
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            delivered_at: row.delivered_at.map(Timestamp::from_datetime),
        })
    }
}

/// Writes the mutable columns. Amount and currency are never updated.
async fn update_order(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = $2,
            provider_transaction_id = $3,
            paid_at = $4,
            delivered_at = $5
        WHERE id = $1
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.status.as_str())
    .bind(&order.provider_transaction_id)
    .bind(order.paid_at.map(|t| *t.as_datetime()))
    .bind(order.delivered_at.map(|t| *t.as_datetime()))
    .execute(conn)
    .await
    .map_err(db_error("Failed to update order"))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::new(ErrorCode::OrderNotFound, "Order not found"));
    }
    Ok(())
}

/// An order row held under `FOR UPDATE` inside an open transaction.
pub struct PostgresLockedOrder {
    tx: Transaction<'static, Postgres>,
    order: Order,
}

#[async_trait]
impl LockedOrder for PostgresLockedOrder {
    fn order(&self) -> &Order {
        &self.order
    }

    async fn commit(self: Box<Self>, changes: OrderChanges) -> Result<(), DomainError> {
        let PostgresLockedOrder { mut tx, .. } = *self;

        update_order(&mut tx, &changes.order).await?;
        if let Some(token) = &changes.token {
            insert_token(&mut tx, token).await?;
        }
        for entitlement in &changes.entitlements {
            insert_entitlement(&mut tx, entitlement).await?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit order transition"))
    }

    async fn release(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(db_error("Failed to release order lock"))
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, product_sku, email, amount, currency, external_ref, status,
                provider_transaction_id, created_at, paid_at, delivered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.product_sku)
        .bind(&order.email)
        .bind(order.amount)
        .bind(&order.currency)
        .bind(&order.external_ref)
        .bind(order.status.as_str())
        .bind(&order.provider_transaction_id)
        .bind(order.created_at.as_datetime())
        .bind(order.paid_at.map(|t| *t.as_datetime()))
        .bind(order.delivered_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("orders_external_ref_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateReference,
                        "External reference already used",
                    );
                }
            }
            DomainError::database(format!("Failed to save order: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let query = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Option<Order>, DomainError> {
        let query = format!("SELECT {} FROM orders WHERE external_ref = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&query)
            .bind(external_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_paid_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError> {
        let query = format!(
            "SELECT {} FROM orders WHERE email = $1 AND status = 'paid' ORDER BY paid_at DESC",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&query)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to find paid orders"))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_stale_pending(
        &self,
        created_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<Order>, DomainError> {
        let query = format!(
            "SELECT {} FROM orders \
             WHERE status IN ('created', 'pending') AND created_at < $1 \
             ORDER BY created_at ASC LIMIT $2",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&query)
            .bind(created_before.as_datetime())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list stale orders"))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn mark_delivered(&self, id: &OrderId, at: Timestamp) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE orders SET delivered_at = $2
            WHERE id = $1 AND status = 'paid' AND delivered_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to mark order delivered"))?;

        Ok(())
    }

    async fn lock_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Box<dyn LockedOrder>>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))?;

        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to set lock timeout"))?;

        let query = format!(
            "SELECT {} FROM orders WHERE external_ref = $1 FOR UPDATE",
            ORDER_COLUMNS
        );
        let row: Option<OrderRow> = sqlx::query_as(&query)
            .bind(external_ref)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock order"))?;

        match row {
            Some(row) => {
                let order = Order::try_from(row)?;
                Ok(Some(Box::new(PostgresLockedOrder { tx, order })))
            }
            None => {
                tx.rollback()
                    .await
                    .map_err(db_error("Failed to roll back"))?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> OrderRow {
        OrderRow {
            id: Uuid::new_v4(),
            product_sku: "EBOOK_ASP".to_string(),
            email: "buyer@example.com".to_string(),
            amount: 15000,
            currency: "XOF".to_string(),
            external_ref: "TXN-1".to_string(),
            status: status.to_string(),
            provider_transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn row_converts_to_order() {
        let order = Order::try_from(row("pending")).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.amount, 15000);
        assert_eq!(order.external_ref, "TXN-1");
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let err = Order::try_from(row("refunded")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
