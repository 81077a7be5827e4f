//! HTTP DTOs for download pages, signed files, deliveries, resend and bonus links.

use serde::{Deserialize, Serialize};

use crate::application::handlers::delivery::{DeliveryLink, DeliveryLinks};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct SignedFileQuery {
    pub expires: Option<i64>,
    pub sig: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryQuery {
    /// Document variant label, e.g. `A4`; the first variant when absent.
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BonusQuery {
    pub product_slug: Option<String>,
    pub token: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkResponse {
    pub label: String,
    pub url: String,
}

impl From<DeliveryLink> for LinkResponse {
    fn from(link: DeliveryLink) -> Self {
        Self {
            label: link.label,
            url: link.url,
        }
    }
}

/// Everything the buyer's download page shows.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadPageResponse {
    pub order_id: String,
    pub transaction_id: String,
    pub product_title: String,
    /// Short-lived signed file URLs, one per document variant.
    pub documents: Vec<LinkResponse>,
    pub categories: Vec<LinkResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_url: Option<String>,
    /// One-shot delivery link.
    pub delivery_url: String,
    /// When the page token stops working (RFC 3339).
    pub expires_at: String,
}

impl DownloadPageResponse {
    pub fn new(
        order_id: String,
        transaction_id: String,
        links: DeliveryLinks,
        delivery_url: String,
        expires_at: String,
    ) -> Self {
        Self {
            order_id,
            transaction_id,
            product_title: links.product_title,
            documents: links.documents.into_iter().map(Into::into).collect(),
            categories: links.categories.into_iter().map(Into::into).collect(),
            bonus_url: links.bonus,
            delivery_url,
            expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperatorResendResponse {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BonusResponse {
    pub product_slug: Option<String>,
    pub email: String,
    pub transaction_id: String,
}
