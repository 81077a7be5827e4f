//! TransitionPaymentHandler - the locked, idempotent payment state transition.
//!
//! The order row is locked before its status is read, so concurrent
//! deliveries of the same notification serialize and the loser sees an
//! already-terminal order. The paid/unpaid verdict always comes from the
//! provider check, never from the notification.

use std::sync::Arc;

use crate::application::handlers::delivery::TokenIssuer;
use crate::domain::delivery::DownloadToken;
use crate::domain::entitlement::{Catalog, Entitlement};
use crate::domain::foundation::{StateMachine, Timestamp};
use crate::domain::payment::{AmountCheck, LedgerOutcome, Order, PaymentError};
use crate::ports::{LockedOrder, OrderChanges, OrderRepository, ProviderReconciler};

/// Command to move the order behind a reference towards a final state.
#[derive(Debug, Clone)]
pub struct TransitionPaymentCommand {
    pub external_ref: String,
    /// Status the notification claimed. Logged, never trusted.
    pub claimed_status: String,
    pub claimed_amount: Option<String>,
    pub claimed_currency: Option<String>,
}

impl TransitionPaymentCommand {
    pub fn new(external_ref: impl Into<String>, claimed_status: impl Into<String>) -> Self {
        Self {
            external_ref: external_ref.into(),
            claimed_status: claimed_status.into(),
            claimed_amount: None,
            claimed_currency: None,
        }
    }
}

/// Result of a transition attempt.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// Order was already PAID or CANCELED; nothing was written.
    AlreadyTerminal(Order),
    /// Order moved to PAID; the token and entitlements were written with it.
    TransitionedPaid { order: Order, token: DownloadToken },
    /// Provider says not paid; order moved to FAILED.
    TransitionedFailed(Order),
    UnknownOrder,
}

impl TransitionOutcome {
    pub fn ledger_outcome(&self) -> LedgerOutcome {
        match self {
            TransitionOutcome::AlreadyTerminal(_) => LedgerOutcome::Idempotent,
            TransitionOutcome::TransitionedPaid { .. } => LedgerOutcome::Processed,
            TransitionOutcome::TransitionedFailed(_) => LedgerOutcome::NotPaid,
            TransitionOutcome::UnknownOrder => LedgerOutcome::UnknownOrder,
        }
    }
}

/// Handler for the payment state transition.
///
/// A provider check error leaves the order untouched and surfaces as
/// `PaymentError::Reconcile`.
pub struct TransitionPaymentHandler {
    orders: Arc<dyn OrderRepository>,
    reconciler: Arc<dyn ProviderReconciler>,
    tokens: Arc<TokenIssuer>,
    catalog: Arc<Catalog>,
}

impl TransitionPaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        reconciler: Arc<dyn ProviderReconciler>,
        tokens: Arc<TokenIssuer>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            orders,
            reconciler,
            tokens,
            catalog,
        }
    }

    pub async fn handle(
        &self,
        cmd: TransitionPaymentCommand,
    ) -> Result<TransitionOutcome, PaymentError> {
        let Some(locked) = self.orders.lock_by_external_ref(&cmd.external_ref).await? else {
            tracing::warn!(external_ref = %cmd.external_ref, "Notification for unknown order");
            return Ok(TransitionOutcome::UnknownOrder);
        };
        let order = locked.order().clone();

        if order.status.is_terminal() {
            locked.release().await?;
            tracing::info!(
                external_ref = %order.external_ref,
                status = %order.status,
                "Order already terminal, nothing to do"
            );
            return Ok(TransitionOutcome::AlreadyTerminal(order));
        }

        if let AmountCheck::Mismatch {
            claimed_amount,
            claimed_currency,
        } = order.check_claimed_amount(cmd.claimed_amount.as_deref(), cmd.claimed_currency.as_deref())
        {
            tracing::warn!(
                external_ref = %order.external_ref,
                stored_amount = order.amount,
                stored_currency = %order.currency,
                claimed_amount = ?claimed_amount,
                claimed_currency = ?claimed_currency,
                "Notification amount differs from stored order"
            );
        }

        let verdict = match self.reconciler.check(&order.external_ref).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::error!(
                    external_ref = %order.external_ref,
                    reconciler = self.reconciler.name(),
                    error = %err,
                    "Provider check failed, order left unchanged"
                );
                release_quietly(locked, &order).await;
                return Err(err.into());
            }
        };

        tracing::info!(
            external_ref = %order.external_ref,
            claimed_status = %cmd.claimed_status,
            provider_paid = verdict.is_paid,
            "Provider verdict received"
        );

        if verdict.is_paid {
            self.commit_paid(locked, order, verdict.provider_transaction_id).await
        } else {
            let mut order = order;
            order.mark_failed()?;
            locked.commit(OrderChanges::status_only(order.clone())).await?;
            Ok(TransitionOutcome::TransitionedFailed(order))
        }
    }

    async fn commit_paid(
        &self,
        locked: Box<dyn LockedOrder>,
        mut order: Order,
        provider_transaction_id: Option<String>,
    ) -> Result<TransitionOutcome, PaymentError> {
        let now = Timestamp::now();
        order.mark_paid(provider_transaction_id, now)?;

        let token = self
            .tokens
            .mint(&order, now)
            .map_err(|e| PaymentError::Infrastructure(e.to_string()))?;

        let entitlements = self
            .catalog
            .categories_granted_by(&order.product_sku)
            .into_iter()
            .map(|category| Entitlement::site(&order.email, &category.slug, &order.external_ref, now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PaymentError::Validation(e.to_string()))?;

        locked
            .commit(OrderChanges {
                order: order.clone(),
                token: Some(token.clone()),
                entitlements,
            })
            .await?;

        tracing::info!(
            external_ref = %order.external_ref,
            order_id = %order.id,
            "Order paid"
        );
        Ok(TransitionOutcome::TransitionedPaid { order, token })
    }
}

async fn release_quietly(locked: Box<dyn LockedOrder>, order: &Order) {
    if let Err(err) = locked.release().await {
        tracing::warn!(external_ref = %order.external_ref, error = %err, "Failed to release order lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cinetpay::MockReconciler;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::delivery::TokenPolicy;
    use crate::domain::payment::{OrderStatus, ReconcileError, ReconcileVerdict};

    struct Fixture {
        handler: TransitionPaymentHandler,
        store: InMemoryStore,
        reconciler: MockReconciler,
        order: Order,
    }

    async fn fixture(reconciler: MockReconciler) -> Fixture {
        let store = InMemoryStore::new();
        let mut order =
            Order::with_reference("EBOOK_ASP", "buyer@example.com", 15000, "XOF", "TXN-1", Timestamp::now())
                .unwrap();
        order.begin_payment().unwrap();
        OrderRepository::insert(&store, &order).await.unwrap();

        let tokens = Arc::new(TokenIssuer::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TokenPolicy::default(),
        ));
        let handler = TransitionPaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(reconciler.clone()),
            tokens,
            Arc::new(Catalog::builtin().unwrap()),
        );
        Fixture {
            handler,
            store,
            reconciler,
            order,
        }
    }

    async fn stored(store: &InMemoryStore, order: &Order) -> Order {
        store.find_by_id(&order.id).await.unwrap().unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Paid path
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_verdict_pays_order_and_writes_token_and_grants() {
        let f = fixture(MockReconciler::paying()).await;

        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();

        assert!(matches!(outcome, TransitionOutcome::TransitionedPaid { .. }));
        assert_eq!(outcome.ledger_outcome(), LedgerOutcome::Processed);
        let order = stored(&f.store, &f.order).await;
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.provider_transaction_id.as_deref(), Some("PROV-1"));
        assert_eq!(f.store.tokens().await.len(), 1);
        assert_eq!(f.store.entitlements().await.len(), 4);
    }

    #[tokio::test]
    async fn second_transition_is_idempotent() {
        let f = fixture(MockReconciler::paying()).await;
        f.handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();

        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();

        assert!(matches!(outcome, TransitionOutcome::AlreadyTerminal(_)));
        assert_eq!(f.store.tokens().await.len(), 1);
        assert_eq!(f.reconciler.calls().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_transitions_pay_exactly_once() {
        let f = fixture(MockReconciler::paying()).await;
        let handler = Arc::new(f.handler);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler
                        .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut paid = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), TransitionOutcome::TransitionedPaid { .. }) {
                paid += 1;
            }
        }
        assert_eq!(paid, 1);
        assert_eq!(f.store.tokens().await.len(), 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Fail-closed
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn not_paid_verdict_fails_order_despite_success_claim() {
        let f = fixture(MockReconciler::new()).await;

        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();

        assert!(matches!(outcome, TransitionOutcome::TransitionedFailed(_)));
        assert_eq!(stored(&f.store, &f.order).await.status, OrderStatus::Failed);
        assert!(f.store.tokens().await.is_empty());
        assert!(f.store.entitlements().await.is_empty());
    }

    #[tokio::test]
    async fn reconcile_error_leaves_order_pending() {
        let f = fixture(MockReconciler::paying()).await;
        f.reconciler.set_error("TXN-1", ReconcileError::Timeout);

        let err = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Reconcile(ReconcileError::Timeout)));
        assert_eq!(stored(&f.store, &f.order).await.status, OrderStatus::Pending);

        // Lock was released: a later check can still pay the order.
        f.reconciler.set_verdict("TXN-1", ReconcileVerdict::paid("P-9"));
        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::TransitionedPaid { .. }));
    }

    #[tokio::test]
    async fn failed_order_is_rechecked_and_can_be_paid() {
        let f = fixture(MockReconciler::new()).await;
        f.handler
            .handle(TransitionPaymentCommand::new("TXN-1", "FAILED"))
            .await
            .unwrap();

        f.reconciler.set_verdict("TXN-1", ReconcileVerdict::paid("P-2"));
        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-1", "SUCCESS"))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::TransitionedPaid { .. }));
    }

    #[tokio::test]
    async fn unknown_reference_reports_unknown_order() {
        let f = fixture(MockReconciler::paying()).await;
        let outcome = f
            .handler
            .handle(TransitionPaymentCommand::new("TXN-404", "SUCCESS"))
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::UnknownOrder));
        assert!(f.reconciler.calls().is_empty());
    }

    #[tokio::test]
    async fn claimed_amount_never_changes_stored_amount() {
        let f = fixture(MockReconciler::paying()).await;
        let cmd = TransitionPaymentCommand {
            claimed_amount: Some("100".into()),
            claimed_currency: Some("EUR".into()),
            ..TransitionPaymentCommand::new("TXN-1", "SUCCESS")
        };

        f.handler.handle(cmd).await.unwrap();

        let order = stored(&f.store, &f.order).await;
        assert_eq!(order.amount, 15000);
        assert_eq!(order.currency, "XOF");
        assert_eq!(order.status, OrderStatus::Paid);
    }
}
