//! TokenIssuer - mints and redeems download tokens for paid orders.

use chrono::Duration;
use std::sync::Arc;

use crate::config::DeliveryConfig;
use crate::domain::delivery::{is_well_formed, DeliveryError, DownloadToken, Redemption, TokenKind, TokenState};
use crate::domain::foundation::{OrderId, Timestamp};
use crate::domain::payment::Order;
use crate::ports::{DownloadTokenRepository, OrderRepository};

/// Lifetimes and ceilings applied to new tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub read_ttl: Duration,
    pub consumable_ttl: Duration,
    pub consumable_max_uses: i32,
}

impl TokenPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            read_ttl: config.token_ttl(),
            consumable_ttl: config.consumable_ttl(),
            consumable_max_uses: config.consumable_max_uses,
        }
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            read_ttl: Duration::hours(72),
            consumable_ttl: Duration::minutes(45),
            consumable_max_uses: 1,
        }
    }
}

/// Issues read tokens (reusable until expiry) and consumable tokens
/// (spent per presentation), and resolves presented values.
pub struct TokenIssuer {
    orders: Arc<dyn OrderRepository>,
    tokens: Arc<dyn DownloadTokenRepository>,
    policy: TokenPolicy,
}

impl TokenIssuer {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        tokens: Arc<dyn DownloadTokenRepository>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            orders,
            tokens,
            policy,
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Builds a read token without storing it. Fails unless the order is paid.
    pub fn mint(&self, order: &Order, now: Timestamp) -> Result<DownloadToken, DeliveryError> {
        if !order.is_paid() {
            return Err(DeliveryError::OrderNotPaid(order.id.to_string()));
        }
        Ok(DownloadToken::mint_read(order.id, self.policy.read_ttl, now))
    }

    /// Mints and stores a fresh read token.
    pub async fn issue(&self, order: &Order) -> Result<DownloadToken, DeliveryError> {
        let token = self.mint(order, Timestamp::now())?;
        self.tokens.insert(&token).await?;
        tracing::info!(order_id = %order.id, expires_at = ?token.expires_at.as_datetime(), "Issued download token");
        Ok(token)
    }

    /// Returns a still-valid read token for the order, issuing one if none is left.
    pub async fn ensure(&self, order: &Order) -> Result<DownloadToken, DeliveryError> {
        if !order.is_paid() {
            return Err(DeliveryError::OrderNotPaid(order.id.to_string()));
        }
        let existing = self
            .tokens
            .find_usable_for_order(&order.id, TokenKind::Read, Timestamp::now())
            .await?;
        match existing {
            Some(token) => Ok(token),
            None => self.issue(order).await,
        }
    }

    /// Mints and stores a token that is spent on each delivery.
    pub async fn issue_consumable(&self, order: &Order) -> Result<DownloadToken, DeliveryError> {
        if !order.is_paid() {
            return Err(DeliveryError::OrderNotPaid(order.id.to_string()));
        }
        let token = DownloadToken::mint_consumable(
            order.id,
            self.policy.consumable_ttl,
            self.policy.consumable_max_uses,
            Timestamp::now(),
        );
        self.tokens.insert(&token).await?;
        Ok(token)
    }

    /// Returns an unspent consumable token for the order, minting one only
    /// when none is left.
    pub async fn ensure_consumable(&self, order: &Order) -> Result<DownloadToken, DeliveryError> {
        if !order.is_paid() {
            return Err(DeliveryError::OrderNotPaid(order.id.to_string()));
        }
        let existing = self
            .tokens
            .find_usable_for_order(&order.id, TokenKind::Consumable, Timestamp::now())
            .await?;
        match existing {
            Some(token) => Ok(token),
            None => self.issue_consumable(order).await,
        }
    }

    /// Resolves a read token. Has no side effect.
    pub async fn redeem(&self, value: &str) -> Result<Redemption, DeliveryError> {
        self.redeem_at(value, Timestamp::now()).await
    }

    /// Resolves a read token presented together with the order it claims to belong to.
    pub async fn redeem_for_order(
        &self,
        order_id: &OrderId,
        value: &str,
    ) -> Result<Redemption, DeliveryError> {
        match self.redeem(value).await? {
            Redemption::Redeemed { order, .. } if order.id != *order_id => Ok(Redemption::Invalid),
            other => Ok(other),
        }
    }

    pub async fn redeem_at(&self, value: &str, now: Timestamp) -> Result<Redemption, DeliveryError> {
        if !is_well_formed(value) {
            return Ok(Redemption::Invalid);
        }
        let Some(token) = self.tokens.find_by_value(value).await? else {
            return Ok(Redemption::NotFound);
        };
        if token.kind != TokenKind::Read {
            return Ok(Redemption::Invalid);
        }
        if token.state_at(now) == TokenState::Expired {
            return Ok(Redemption::Expired);
        }
        self.paid_order_for(token).await
    }

    /// Spends one use of a consumable token.
    pub async fn consume(&self, value: &str) -> Result<Redemption, DeliveryError> {
        self.consume_at(value, Timestamp::now()).await
    }

    pub async fn consume_at(&self, value: &str, now: Timestamp) -> Result<Redemption, DeliveryError> {
        if !is_well_formed(value) {
            return Ok(Redemption::Invalid);
        }
        if let Some(token) = self.tokens.try_consume(value, now).await? {
            return self.paid_order_for(token).await;
        }
        // Nothing was spent: tell apart missing, wrong kind and used up.
        match self.tokens.find_by_value(value).await? {
            None => Ok(Redemption::NotFound),
            Some(token) if token.kind != TokenKind::Consumable => Ok(Redemption::Invalid),
            Some(_) => Ok(Redemption::Expired),
        }
    }

    async fn paid_order_for(&self, token: DownloadToken) -> Result<Redemption, DeliveryError> {
        match self.orders.find_by_id(&token.order_id).await? {
            Some(order) if order.is_paid() => Ok(Redemption::Redeemed { order, token }),
            Some(order) => {
                tracing::warn!(order_id = %order.id, status = %order.status, "Token presented for unpaid order");
                Ok(Redemption::Invalid)
            }
            None => Ok(Redemption::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;

    async fn setup() -> (TokenIssuer, InMemoryStore, Order) {
        let store = InMemoryStore::new();
        let mut order =
            Order::with_reference("EBOOK_ASP", "buyer@example.com", 15000, "XOF", "TXN-1", Timestamp::now())
                .unwrap();
        order.mark_paid(Some("P-1".into()), Timestamp::now()).unwrap();
        store.put_order(order.clone()).await;
        let issuer = TokenIssuer::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TokenPolicy::default(),
        );
        (issuer, store, order)
    }

    // ══════════════════════════════════════════════════════════════
    // Read tokens
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn issue_requires_paid_order() {
        let (issuer, _, _) = setup().await;
        let unpaid =
            Order::with_reference("EBOOK_ASP", "buyer@example.com", 15000, "XOF", "TXN-2", Timestamp::now())
                .unwrap();
        assert!(matches!(
            issuer.issue(&unpaid).await,
            Err(DeliveryError::OrderNotPaid(_))
        ));
    }

    #[tokio::test]
    async fn read_token_redeems_repeatedly() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue(&order).await.unwrap();

        for _ in 0..3 {
            match issuer.redeem(&token.value).await.unwrap() {
                Redemption::Redeemed { order: found, .. } => assert_eq!(found.id, order.id),
                other => panic!("expected redemption, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn token_expires_at_its_horizon() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue(&order).await.unwrap();

        let before = token.expires_at.minus(Duration::seconds(1));
        assert!(matches!(
            issuer.redeem_at(&token.value, before).await.unwrap(),
            Redemption::Redeemed { .. }
        ));
        assert_eq!(
            issuer.redeem_at(&token.value, token.expires_at).await.unwrap(),
            Redemption::Expired
        );
        let after = token.expires_at.plus(Duration::hours(1));
        assert_eq!(issuer.redeem_at(&token.value, after).await.unwrap(), Redemption::Expired);
    }

    #[tokio::test]
    async fn unknown_and_malformed_values_are_distinguished() {
        let (issuer, _, _) = setup().await;
        assert_eq!(issuer.redeem("short").await.unwrap(), Redemption::Invalid);
        assert_eq!(issuer.redeem(&"a".repeat(64)).await.unwrap(), Redemption::NotFound);
    }

    #[tokio::test]
    async fn token_for_other_order_is_invalid() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue(&order).await.unwrap();
        assert_eq!(
            issuer.redeem_for_order(&OrderId::new(), &token.value).await.unwrap(),
            Redemption::Invalid
        );
        assert!(matches!(
            issuer.redeem_for_order(&order.id, &token.value).await.unwrap(),
            Redemption::Redeemed { .. }
        ));
    }

    #[tokio::test]
    async fn ensure_reuses_a_valid_token() {
        let (issuer, store, order) = setup().await;
        let first = issuer.ensure(&order).await.unwrap();
        let second = issuer.ensure(&order).await.unwrap();
        assert_eq!(first.value, second.value);
        assert_eq!(store.tokens().await.len(), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Consumable tokens
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn consumable_token_is_spent_once() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue_consumable(&order).await.unwrap();

        assert!(matches!(
            issuer.consume(&token.value).await.unwrap(),
            Redemption::Redeemed { .. }
        ));
        assert_eq!(issuer.consume(&token.value).await.unwrap(), Redemption::Expired);
    }

    #[tokio::test]
    async fn ensure_consumable_mints_again_only_once_spent() {
        let (issuer, store, order) = setup().await;
        let first = issuer.ensure_consumable(&order).await.unwrap();
        let again = issuer.ensure_consumable(&order).await.unwrap();
        assert_eq!(first.value, again.value);
        assert_eq!(store.tokens().await.len(), 1);

        issuer.consume(&first.value).await.unwrap();
        let fresh = issuer.ensure_consumable(&order).await.unwrap();
        assert_ne!(fresh.value, first.value);
        assert_eq!(store.tokens().await.len(), 2);
    }

    #[tokio::test]
    async fn read_token_cannot_be_consumed() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue(&order).await.unwrap();
        assert_eq!(issuer.consume(&token.value).await.unwrap(), Redemption::Invalid);
    }

    #[tokio::test]
    async fn consumable_token_is_not_a_read_token() {
        let (issuer, _, order) = setup().await;
        let token = issuer.issue_consumable(&order).await.unwrap();
        assert_eq!(issuer.redeem(&token.value).await.unwrap(), Redemption::Invalid);
    }
}
