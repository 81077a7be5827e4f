//! HTTP DTOs for gated categories and claims.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Claim form: an email plus what was bought, or a claim code from an import.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRequest {
    pub email: Option<String>,
    /// Category slug or product SKU.
    pub category: String,
    pub claim_code: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryFile {
    pub name: String,
    /// Short-lived signed URL.
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    pub slug: String,
    pub title: String,
    pub files: Vec<CategoryFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResponse {
    /// `granted` or `manual_review`.
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl ClaimResponse {
    pub fn granted(categories: Vec<String>) -> Self {
        Self {
            status: "granted".to_string(),
            message: "Access unlocked".to_string(),
            categories,
        }
    }

    pub fn manual_review() -> Self {
        Self {
            status: "manual_review".to_string(),
            message: "We could not match a purchase; your request will be reviewed".to_string(),
            categories: Vec::new(),
        }
    }
}
