//! DownloadTokenRepository port.

use async_trait::async_trait;

use crate::domain::delivery::{DownloadToken, TokenKind};
use crate::domain::foundation::{DomainError, OrderId, Timestamp};

#[async_trait]
pub trait DownloadTokenRepository: Send + Sync {
    /// Stores a token. Token values are unique across all orders.
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError>;

    async fn find_by_value(&self, value: &str) -> Result<Option<DownloadToken>, DomainError>;

    /// Latest token of `kind` for the order that is still usable at `now`.
    async fn find_usable_for_order(
        &self,
        order_id: &OrderId,
        kind: TokenKind,
        now: Timestamp,
    ) -> Result<Option<DownloadToken>, DomainError>;

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError>;

    /// Spends one use of a consumable token if it is unexpired and below its
    /// ceiling at `now`, atomically. Returns the token after the spend, or
    /// `None` when nothing was spent.
    async fn try_consume(&self, value: &str, now: Timestamp) -> Result<Option<DownloadToken>, DomainError>;
}
