//! HandleWebhookHandler - inbound payment notifications.
//!
//! Every attempt is written to the ledger before anything else happens,
//! verified or not. Only a valid signature over the received bytes lets a
//! notification reach the state transition.

use std::sync::Arc;

use crate::domain::foundation::LedgerEntryId;
use crate::domain::payment::{
    Claims, LedgerOutcome, NewLedgerEntry, NotificationError, PaymentError, Provider,
    SignatureVerifier,
};
use crate::ports::WebhookLedger;

use super::post_payment::PostPaymentActions;
use super::transition_payment::{TransitionOutcome, TransitionPaymentCommand, TransitionPaymentHandler};

/// Command carrying one notification exactly as received.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    pub provider: Provider,
    pub raw_body: Vec<u8>,
    /// Signature taken from a request header, if any.
    pub header_signature: Option<String>,
}

/// What was recorded and what to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleWebhookResult {
    pub ledger_entry_id: LedgerEntryId,
    pub outcome: LedgerOutcome,
}

impl HandleWebhookResult {
    pub fn http_status(&self) -> u16 {
        self.outcome.http_status()
    }
}

/// Where the signature came from and what it covers.
enum SignatureSource {
    /// Header value over the raw body.
    Header(String),
    /// Legacy body field over `ref|status|amount|currency`.
    BodyField(String),
    Missing,
}

pub struct HandleWebhookHandler {
    verifier: SignatureVerifier,
    ledger: Arc<dyn WebhookLedger>,
    transition: Arc<TransitionPaymentHandler>,
    post_payment: Arc<PostPaymentActions>,
}

impl HandleWebhookHandler {
    pub fn new(
        verifier: SignatureVerifier,
        ledger: Arc<dyn WebhookLedger>,
        transition: Arc<TransitionPaymentHandler>,
        post_payment: Arc<PostPaymentActions>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            transition,
            post_payment,
        }
    }

    /// Records and processes one notification.
    ///
    /// Errors only when the ledger write or the transition's storage fails;
    /// those answer 500 so the provider redelivers. A storage failure after
    /// the entry exists is recorded as `failed` first.
    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<HandleWebhookResult, PaymentError> {
        let parsed = Claims::from_body(&cmd.raw_body);
        let claims = parsed.clone().unwrap_or_default();

        let source = match cmd.header_signature.filter(|s| !s.trim().is_empty()) {
            Some(sig) => SignatureSource::Header(sig),
            None => match &claims.signature {
                Some(sig) => SignatureSource::BodyField(sig.clone()),
                None => SignatureSource::Missing,
            },
        };
        let (signature, verified) = match source {
            SignatureSource::Header(sig) => {
                let ok = self.verifier.verify(&cmd.raw_body, &sig);
                (Some(sig), ok)
            }
            SignatureSource::BodyField(sig) => {
                let ok = self.verifier.verify(claims.field_signing_input().as_bytes(), &sig);
                (Some(sig), ok)
            }
            SignatureSource::Missing => (None, false),
        };

        let entry_id = self
            .ledger
            .record(NewLedgerEntry::new(
                cmd.provider,
                claims.external_ref.clone(),
                claims.status.clone(),
                signature,
                cmd.raw_body,
                verified,
            ))
            .await
            .map_err(|e| {
                tracing::error!(provider = %cmd.provider, error = %e, "Ledger write failed");
                PaymentError::Infrastructure(e.to_string())
            })?;

        let outcome = match self.process(cmd.provider, parsed, claims, verified).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.record_outcome(&entry_id, LedgerOutcome::Failed).await;
                return Err(err);
            }
        };
        self.record_outcome(&entry_id, outcome).await;

        Ok(HandleWebhookResult {
            ledger_entry_id: entry_id,
            outcome,
        })
    }

    async fn record_outcome(&self, entry_id: &LedgerEntryId, outcome: LedgerOutcome) {
        if let Err(err) = self.ledger.record_outcome(entry_id, outcome).await {
            tracing::warn!(ledger_entry = %entry_id, error = %err, "Failed to record webhook outcome");
        }
    }

    async fn process(
        &self,
        provider: Provider,
        parsed: Result<Claims, NotificationError>,
        claims: Claims,
        verified: bool,
    ) -> Result<LedgerOutcome, PaymentError> {
        if let Err(err) = parsed {
            tracing::warn!(provider = %provider, error = %err, "Malformed webhook body");
            return Ok(LedgerOutcome::Malformed);
        }
        if !verified {
            tracing::warn!(
                provider = %provider,
                external_ref = ?claims.external_ref,
                "Webhook signature rejected"
            );
            return Ok(LedgerOutcome::RejectedSignature);
        }
        let notification = match claims.into_notification() {
            Ok(notification) => notification,
            Err(err) => {
                tracing::warn!(provider = %provider, error = %err, "Webhook without reference");
                return Ok(LedgerOutcome::Malformed);
            }
        };

        let cmd = TransitionPaymentCommand {
            external_ref: notification.external_ref.clone(),
            claimed_status: notification.claimed_status.clone(),
            claimed_amount: notification.claimed_amount.clone(),
            claimed_currency: notification.claimed_currency.clone(),
        };
        let outcome = match self.transition.handle(cmd).await {
            Ok(outcome) => outcome,
            Err(PaymentError::Reconcile(_)) => return Ok(LedgerOutcome::CheckFailed),
            Err(err) => {
                tracing::error!(
                    external_ref = %notification.external_ref,
                    error = %err,
                    "Payment transition failed"
                );
                return Err(err);
            }
        };

        let ledger_outcome = outcome.ledger_outcome();
        if let TransitionOutcome::TransitionedPaid { order, token } = outcome {
            self.post_payment.start(order, token);
        }
        tracing::info!(
            provider = %provider,
            external_ref = %notification.external_ref,
            claims_paid = notification.claims_paid(),
            outcome = %ledger_outcome,
            "Webhook processed"
        );
        Ok(ledger_outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cinetpay::MockReconciler;
    use crate::adapters::email::RecordingMailer;
    use crate::adapters::jobs::RecordingJobQueue;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::delivery::{
        FulfillmentDispatcher, LinkBuilder, TokenIssuer, TokenPolicy,
    };
    use crate::domain::delivery::{BonusLinkSigner, UrlSigner};
    use crate::domain::entitlement::Catalog;
    use crate::domain::foundation::Timestamp;
    use crate::domain::payment::{Order, OrderStatus, ReconcileError};
    use crate::ports::OrderRepository;
    use chrono::Duration;
    use secrecy::SecretString;

    const SECRET: &str = "webhook-secret-webhook-secret-000";

    struct Fixture {
        handler: HandleWebhookHandler,
        store: InMemoryStore,
        reconciler: MockReconciler,
        mailer: RecordingMailer,
        jobs: RecordingJobQueue,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let reconciler = MockReconciler::paying();
        let mailer = RecordingMailer::new();
        let jobs = RecordingJobQueue::new();
        let catalog = Arc::new(Catalog::builtin().unwrap());

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
        let transition = Arc::new(TransitionPaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(reconciler.clone()),
            tokens,
            catalog.clone(),
        ));
        let signing = SecretString::new("l".repeat(32));
        let fulfillment = Arc::new(FulfillmentDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            catalog,
            LinkBuilder::new(
                "https://shop.example",
                UrlSigner::new(signing.clone(), Duration::minutes(15)),
                BonusLinkSigner::new(signing, Duration::days(7)),
            ),
        ));
        let post_payment = Arc::new(PostPaymentActions::new(fulfillment, Arc::new(jobs.clone())));
        let handler = HandleWebhookHandler::new(
            SignatureVerifier::new(SecretString::new(SECRET.to_string())),
            Arc::new(store.clone()),
            transition,
            post_payment,
        );
        Fixture {
            handler,
            store,
            reconciler,
            mailer,
            jobs,
        }
    }

    fn signed(body: &[u8]) -> HandleWebhookCommand {
        let verifier = SignatureVerifier::new(SecretString::new(SECRET.to_string()));
        HandleWebhookCommand {
            provider: Provider::CinetPay,
            raw_body: body.to_vec(),
            header_signature: Some(verifier.sign_hex(body)),
        }
    }

    const BODY: &[u8] = br#"{"transaction_id":"TXN-1","status":"SUCCESS"}"#;

    async fn order_status(store: &InMemoryStore) -> OrderStatus {
        store.find_by_external_ref("TXN-1").await.unwrap().unwrap().status
    }

    // ══════════════════════════════════════════════════════════════
    // Happy path and replay
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_notification_pays_and_fulfills_once() {
        let f = fixture().await;

        let first = f.handler.handle(signed(BODY)).await.unwrap();
        let replay = f.handler.handle(signed(BODY)).await.unwrap();

        assert_eq!(first.outcome, LedgerOutcome::Processed);
        assert_eq!(first.http_status(), 200);
        assert_eq!(replay.outcome, LedgerOutcome::Idempotent);
        assert_eq!(replay.http_status(), 200);

        assert_eq!(order_status(&f.store).await, OrderStatus::Paid);
        assert_eq!(f.store.tokens().await.len(), 1);
        assert_eq!(f.jobs.jobs().len(), 1);
        assert_eq!(f.mailer.wait_for_sent(1).await.len(), 1);

        let entries = f.store.ledger_entries().await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.verified));
        assert_eq!(entries[0].outcome, Some(LedgerOutcome::Processed));
        assert_eq!(entries[1].outcome, Some(LedgerOutcome::Idempotent));
    }

    #[tokio::test]
    async fn legacy_body_signature_is_accepted() {
        let f = fixture().await;
        let verifier = SignatureVerifier::new(SecretString::new(SECRET.to_string()));
        let sig = verifier.sign_hex(b"TXN-1|SUCCESS|15000|XOF");
        let body = format!(
            r#"{{"transaction_id":"TXN-1","status":"SUCCESS","amount":15000,"currency":"XOF","signature":"{}"}}"#,
            sig
        );

        let result = f
            .handler
            .handle(HandleWebhookCommand {
                provider: Provider::OrangeMoney,
                raw_body: body.into_bytes(),
                header_signature: None,
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, LedgerOutcome::Processed);
    }

    // ══════════════════════════════════════════════════════════════
    // Rejections
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bad_signature_is_recorded_unverified_and_changes_nothing() {
        let f = fixture().await;
        let cmd = HandleWebhookCommand {
            header_signature: Some("bad".into()),
            ..signed(BODY)
        };

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result.outcome, LedgerOutcome::RejectedSignature);
        assert_eq!(result.http_status(), 400);
        assert_eq!(order_status(&f.store).await, OrderStatus::Pending);
        let entries = f.store.ledger_entries().await;
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].verified);
        assert!(f.reconciler.calls().is_empty());
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let f = fixture().await;
        let cmd = HandleWebhookCommand {
            header_signature: None,
            ..signed(BODY)
        };
        let result = f.handler.handle(cmd).await.unwrap();
        assert_eq!(result.outcome, LedgerOutcome::RejectedSignature);
    }

    #[tokio::test]
    async fn malformed_json_and_missing_reference_answer_400() {
        let f = fixture().await;

        let garbage = f.handler.handle(signed(b"not json")).await.unwrap();
        assert_eq!(garbage.outcome, LedgerOutcome::Malformed);
        assert_eq!(garbage.http_status(), 400);

        let no_ref = f.handler.handle(signed(br#"{"status":"SUCCESS"}"#)).await.unwrap();
        assert_eq!(no_ref.outcome, LedgerOutcome::Malformed);
        assert_eq!(f.store.ledger_entries().await.len(), 2);
    }

    // ══════════════════════════════════════════════════════════════
    // Acknowledged without payment
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let f = fixture().await;
        let result = f
            .handler
            .handle(signed(br#"{"transaction_id":"TXN-404","status":"SUCCESS"}"#))
            .await
            .unwrap();
        assert_eq!(result.outcome, LedgerOutcome::UnknownOrder);
        assert_eq!(result.http_status(), 200);
    }

    #[tokio::test]
    async fn check_failure_is_acknowledged_and_order_stays_pending() {
        let f = fixture().await;
        f.reconciler.set_error("TXN-1", ReconcileError::Network("reset".into()));

        let result = f.handler.handle(signed(BODY)).await.unwrap();

        assert_eq!(result.outcome, LedgerOutcome::CheckFailed);
        assert_eq!(result.http_status(), 200);
        assert_eq!(order_status(&f.store).await, OrderStatus::Pending);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn ledger_outage_fails_the_request() {
        let f = fixture().await;
        f.store.set_ledger_unavailable(true);

        let err = f.handler.handle(signed(BODY)).await.unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(order_status(&f.store).await, OrderStatus::Pending);
        assert!(f.reconciler.calls().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_in_transition_is_recorded_as_failed() {
        let f = fixture().await;
        f.store.set_locks_unavailable(true);

        let err = f.handler.handle(signed(BODY)).await.unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(order_status(&f.store).await, OrderStatus::Pending);
        let entries = f.store.ledger_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, Some(LedgerOutcome::Failed));
        assert_eq!(entries[0].http_status, Some(500));
    }

    #[tokio::test]
    async fn slow_mailer_does_not_hold_the_notification() {
        let f = fixture().await;
        f.mailer.set_delay(std::time::Duration::from_secs(3));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            f.handler.handle(signed(BODY)),
        )
        .await
        .expect("notification answered before the mailer finished")
        .unwrap();

        assert_eq!(result.outcome, LedgerOutcome::Processed);
        assert_eq!(
            f.store.ledger_entries().await[0].outcome,
            Some(LedgerOutcome::Processed)
        );
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn mail_outage_does_not_undo_payment() {
        let f = fixture().await;
        f.mailer
            .set_failure(Some(crate::ports::MailError::Transient("down".into())));

        let result = f.handler.handle(signed(BODY)).await.unwrap();

        assert_eq!(result.outcome, LedgerOutcome::Processed);
        assert_eq!(order_status(&f.store).await, OrderStatus::Paid);
    }
}
