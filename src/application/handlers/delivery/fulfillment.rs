//! FulfillmentDispatcher - emails a paid order's download links.
//!
//! Every file link is a freshly signed short-lived URL; the long-lived
//! download token only appears in the download page link. Sending is
//! best-effort: a failure is logged and returned but never touches the
//! order's payment status.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::delivery::{BonusLinkSigner, DownloadToken, FulfillmentError, UrlSigner};
use crate::domain::entitlement::Catalog;
use crate::domain::foundation::Timestamp;
use crate::domain::payment::Order;
use crate::ports::{EmailMessage, EntitlementRepository, Mailer, OrderRepository};

/// A labelled absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLink {
    pub label: String,
    pub url: String,
}

/// Everything a buyer receives for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLinks {
    pub product_title: String,
    /// One signed URL per document variant.
    pub documents: Vec<DeliveryLink>,
    /// Category pages unlocked for the buyer's email.
    pub categories: Vec<DeliveryLink>,
    pub bonus: Option<String>,
    pub download_page: String,
}

/// Signers and the public origin used to build links.
#[derive(Clone)]
pub struct LinkBuilder {
    base_url: String,
    files: UrlSigner,
    bonus: BonusLinkSigner,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>, files: UrlSigner, bonus: BonusLinkSigner) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files,
            bonus,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn file_url(&self, path: &str, now: Timestamp) -> String {
        format!("{}{}", self.base_url, self.files.sign(path, now))
    }

    pub fn category_url(&self, slug: &str) -> String {
        format!("{}/downloads/categories/{}", self.base_url, slug)
    }

    pub fn download_page_url(&self, order: &Order, token: &DownloadToken) -> String {
        format!("{}/downloads/orders/{}/{}", self.base_url, order.id, token.value)
    }

    /// One-shot delivery link for a consumable token.
    pub fn delivery_url(&self, token: &DownloadToken) -> String {
        format!("{}/deliveries/{}", self.base_url, token.value)
    }

    pub fn bonus_url(&self, product_slug: &str, order: &Order, now: Timestamp) -> String {
        format!(
            "{}/bonus/kit-preparation/start?product_slug={}&token={}",
            self.base_url,
            product_slug,
            self.bonus.issue(&order.external_ref, &order.email, now)
        )
    }
}

pub struct FulfillmentDispatcher {
    orders: Arc<dyn OrderRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    mailer: Arc<dyn Mailer>,
    catalog: Arc<Catalog>,
    links: LinkBuilder,
}

impl FulfillmentDispatcher {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        mailer: Arc<dyn Mailer>,
        catalog: Arc<Catalog>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            orders,
            entitlements,
            mailer,
            catalog,
            links,
        }
    }

    /// Resolves the links for a paid order at `now`.
    pub async fn links_for(
        &self,
        order: &Order,
        token: &DownloadToken,
        now: Timestamp,
    ) -> Result<DeliveryLinks, FulfillmentError> {
        if !order.is_paid() {
            return Err(FulfillmentError::OrderNotPaid(order.id.to_string()));
        }
        let product = self.catalog.product(&order.product_sku);

        let documents = product
            .map(|p| {
                p.variants
                    .iter()
                    .map(|variant| DeliveryLink {
                        label: variant.label.clone(),
                        url: self.links.file_url(&variant.path, now),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let unlocked: HashSet<String> = self
            .entitlements
            .categories_for_email(&order.email)
            .await?
            .into_iter()
            .collect();
        let categories = self
            .catalog
            .categories()
            .iter()
            .filter(|c| unlocked.contains(&c.slug))
            .map(|c| DeliveryLink {
                label: c.title.clone(),
                url: self.links.category_url(&c.slug),
            })
            .collect();

        Ok(DeliveryLinks {
            product_title: product
                .map(|p| p.title.clone())
                .unwrap_or_else(|| order.product_sku.clone()),
            documents,
            categories,
            bonus: product.map(|p| self.links.bonus_url(&p.slug, order, now)),
            download_page: self.links.download_page_url(order, token),
        })
    }

    /// Sends the fulfillment email and marks the order delivered.
    pub async fn dispatch(&self, order: &Order, token: &DownloadToken) -> Result<(), FulfillmentError> {
        let now = Timestamp::now();
        let links = self.links_for(order, token, now).await?;
        let message = render_email(&order.email, &order.external_ref, &links);

        if let Err(err) = self.mailer.send(&message).await {
            tracing::error!(
                order_id = %order.id,
                external_ref = %order.external_ref,
                error = %err,
                "Fulfillment email failed; order stays paid"
            );
            return Err(FulfillmentError::Mail(err.to_string()));
        }

        if let Err(err) = self.orders.mark_delivered(&order.id, now).await {
            tracing::warn!(order_id = %order.id, error = %err, "Email sent but delivery not recorded");
        }
        tracing::info!(
            order_id = %order.id,
            documents = links.documents.len(),
            categories = links.categories.len(),
            "Fulfillment email sent"
        );
        Ok(())
    }
}

fn render_email(to: &str, order_ref: &str, links: &DeliveryLinks) -> EmailMessage {
    let mut text = format!(
        "Bonjour,\n\nVotre paiement pour « {} » est confirmé (référence {}).\n\n",
        links.product_title, order_ref
    );
    let mut html = format!(
        "<p>Bonjour,</p><p>Votre paiement pour <strong>{}</strong> est confirmé (référence {}).</p>",
        links.product_title, order_ref
    );

    if !links.documents.is_empty() {
        text.push_str("Téléchargez votre document (liens valables quelques minutes) :\n");
        html.push_str("<p>Téléchargez votre document (liens valables quelques minutes) :</p><ul>");
        for link in &links.documents {
            text.push_str(&format!("- {} : {}\n", link.label, link.url));
            html.push_str(&format!(r#"<li><a href="{}">{}</a></li>"#, link.url, link.label));
        }
        html.push_str("</ul>");
        text.push('\n');
    }

    if !links.categories.is_empty() {
        text.push_str("Contenus débloqués :\n");
        html.push_str("<p>Contenus débloqués :</p><ul>");
        for link in &links.categories {
            text.push_str(&format!("- {} : {}\n", link.label, link.url));
            html.push_str(&format!(r#"<li><a href="{}">{}</a></li>"#, link.url, link.label));
        }
        html.push_str("</ul>");
        text.push('\n');
    }

    if let Some(bonus) = &links.bonus {
        text.push_str(&format!("Votre kit de préparation : {}\n\n", bonus));
        html.push_str(&format!(
            r#"<p><a href="{}">Accéder à votre kit de préparation</a></p>"#,
            bonus
        ));
    }

    text.push_str(&format!(
        "Votre page de téléchargement reste accessible ici : {}\n",
        links.download_page
    ));
    html.push_str(&format!(
        r#"<p>Votre page de téléchargement reste accessible <a href="{}">ici</a>.</p>"#,
        links.download_page
    ));

    EmailMessage {
        to: to.to_string(),
        subject: format!("Votre commande « {} » est confirmée", links.product_title),
        html,
        text,
    }
}
