//! CinetPay transaction check.
//!
//! POSTs `{apikey, site_id, transaction_id}` to the check endpoint. A payment
//! is confirmed only when `code == "00"` and `data.status == "ACCEPTED"`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::domain::payment::{ReconcileError, ReconcileVerdict};
use crate::ports::ProviderReconciler;

const SUCCESS_CODE: &str = "00";
const ACCEPTED_STATUS: &str = "ACCEPTED";

#[derive(Serialize)]
struct CheckRequest<'a> {
    apikey: &'a str,
    site_id: &'a str,
    transaction_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    code: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<CheckData>,
}

#[derive(Debug, Deserialize)]
struct CheckData {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    operator_id: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
}

impl CheckResponse {
    fn code(&self) -> String {
        match &self.code {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    fn verdict(&self, external_ref: &str) -> ReconcileVerdict {
        let accepted = self
            .data
            .as_ref()
            .and_then(|d| d.status.as_deref())
            .map(|s| s.trim().eq_ignore_ascii_case(ACCEPTED_STATUS))
            .unwrap_or(false);

        if self.code() == SUCCESS_CODE && accepted {
            let transaction_id = self
                .data
                .as_ref()
                .and_then(|d| {
                    [&d.payment_id, &d.operator_id]
                        .into_iter()
                        .flatten()
                        .find(|id| !id.trim().is_empty())
                        .cloned()
                })
                .unwrap_or_else(|| external_ref.to_string());
            ReconcileVerdict::paid(transaction_id)
        } else {
            ReconcileVerdict::not_paid()
        }
    }
}

/// Live CinetPay reconciler.
pub struct CinetPayReconciler {
    api_key: SecretString,
    site_id: String,
    check_url: String,
    http_client: reqwest::Client,
}

impl CinetPayReconciler {
    pub fn new(
        api_key: SecretString,
        site_id: impl Into<String>,
        check_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            site_id: site_id.into(),
            check_url: check_url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl ProviderReconciler for CinetPayReconciler {
    async fn check(&self, external_ref: &str) -> Result<ReconcileVerdict, ReconcileError> {
        let request = CheckRequest {
            apikey: self.api_key.expose_secret(),
            site_id: &self.site_id,
            transaction_id: external_ref,
        };

        tracing::debug!(external_ref = %external_ref, "Checking transaction with CinetPay");

        let response = self
            .http_client
            .post(&self.check_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReconcileError::Timeout
                } else {
                    ReconcileError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), external_ref = %external_ref, "CinetPay check failed");
            return Err(ReconcileError::HttpStatus(status.as_u16()));
        }

        let body: CheckResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ReconcileError::Timeout
            } else {
                ReconcileError::InvalidResponse(e.to_string())
            }
        })?;

        let verdict = body.verdict(external_ref);
        tracing::info!(
            external_ref = %external_ref,
            code = %body.code(),
            message = body.message.as_deref().unwrap_or(""),
            payment_method = body.data.as_ref().and_then(|d| d.payment_method.as_deref()).unwrap_or(""),
            is_paid = verdict.is_paid,
            "CinetPay check completed"
        );
        Ok(verdict)
    }

    fn name(&self) -> &'static str {
        "cinetpay"
    }
}
