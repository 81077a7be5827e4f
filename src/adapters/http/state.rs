//! Shared application state for the HTTP layer.

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::handlers::delivery::{
    FulfillmentDispatcher, LinkBuilder, ResendLinksHandler, TokenIssuer, TokenPolicy,
};
use crate::application::handlers::entitlement::{ClaimEntitlementHandler, EntitlementGate};
use crate::application::handlers::payment::{
    CreateOrderHandler, HandleWebhookHandler, PostPaymentActions, ReconcileStaleHandler,
    TransitionPaymentHandler,
};
use crate::config::AppConfig;
use crate::domain::delivery::{BonusLinkSigner, UrlSigner};
use crate::domain::entitlement::Catalog;
use crate::domain::payment::SignatureVerifier;
use crate::ports::{
    DocumentJobQueue, DownloadTokenRepository, EntitlementRepository, Mailer, OrderRepository,
    ProviderReconciler, SessionValidator, WebhookLedger,
};

use super::session::SessionCodec;

/// Secrets, signers and policies derived from configuration.
#[derive(Clone)]
pub struct HttpSettings {
    pub verifier: SignatureVerifier,
    pub files: UrlSigner,
    pub bonus: BonusLinkSigner,
    pub sessions: SessionCodec,
    pub token_policy: TokenPolicy,
    /// Public origin without a trailing slash.
    pub base_url: String,
    pub always_protected: Vec<String>,
    /// Lowercased account emails allowed to use operator routes.
    pub operators: HashSet<String>,
}

impl HttpSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let delivery = &config.delivery;
        Self {
            verifier: SignatureVerifier::new(config.payment.webhook_secret.clone()),
            files: UrlSigner::new(delivery.signing_secret.clone(), delivery.signed_url_ttl()),
            bonus: BonusLinkSigner::new(delivery.signing_secret.clone(), delivery.bonus_ttl()),
            sessions: SessionCodec::new(
                delivery.session_secret.clone(),
                config.server.base_url().starts_with("https://"),
            ),
            token_policy: TokenPolicy::from_config(delivery),
            base_url: config.server.base_url().to_string(),
            always_protected: delivery.always_protected_list(),
            operators: config.auth.operator_list().into_iter().collect(),
        }
    }

    pub fn is_operator(&self, email: &str) -> bool {
        self.operators.contains(&email.trim().to_lowercase())
    }
}

/// Shared state handed to every route.
///
/// Cloned per request; every field is a cheap handle. Handlers are built on
/// demand from the ports below.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub ledger: Arc<dyn WebhookLedger>,
    pub tokens: Arc<dyn DownloadTokenRepository>,
    pub entitlements: Arc<dyn EntitlementRepository>,
    pub reconciler: Arc<dyn ProviderReconciler>,
    pub mailer: Arc<dyn Mailer>,
    pub jobs: Arc<dyn DocumentJobQueue>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub catalog: Arc<Catalog>,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn token_issuer(&self) -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            self.orders.clone(),
            self.tokens.clone(),
            self.settings.token_policy,
        ))
    }

    pub fn link_builder(&self) -> LinkBuilder {
        LinkBuilder::new(
            self.settings.base_url.clone(),
            self.settings.files.clone(),
            self.settings.bonus.clone(),
        )
    }

    pub fn fulfillment(&self) -> Arc<FulfillmentDispatcher> {
        Arc::new(FulfillmentDispatcher::new(
            self.orders.clone(),
            self.entitlements.clone(),
            self.mailer.clone(),
            self.catalog.clone(),
            self.link_builder(),
        ))
    }

    pub fn post_payment(&self) -> Arc<PostPaymentActions> {
        Arc::new(PostPaymentActions::new(self.fulfillment(), self.jobs.clone()))
    }

    pub fn transition_handler(&self) -> Arc<TransitionPaymentHandler> {
        Arc::new(TransitionPaymentHandler::new(
            self.orders.clone(),
            self.reconciler.clone(),
            self.token_issuer(),
            self.catalog.clone(),
        ))
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(
            self.settings.verifier.clone(),
            self.ledger.clone(),
            self.transition_handler(),
            self.post_payment(),
        )
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(self.orders.clone(), self.catalog.clone())
    }

    pub fn reconcile_stale_handler(&self, concurrency: usize) -> ReconcileStaleHandler {
        ReconcileStaleHandler::new(
            self.orders.clone(),
            self.reconciler.clone(),
            self.transition_handler(),
            self.post_payment(),
            concurrency,
        )
    }

    pub fn resend_handler(&self) -> ResendLinksHandler {
        ResendLinksHandler::new(self.orders.clone(), self.token_issuer(), self.fulfillment())
    }

    pub fn claim_handler(&self) -> ClaimEntitlementHandler {
        ClaimEntitlementHandler::new(
            self.orders.clone(),
            self.entitlements.clone(),
            self.catalog.clone(),
        )
    }

    pub fn entitlement_gate(&self) -> EntitlementGate {
        EntitlementGate::new(
            self.catalog.clone(),
            self.entitlements.clone(),
            self.settings.always_protected.iter().cloned(),
        )
    }
}
