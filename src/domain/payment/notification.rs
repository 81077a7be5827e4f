//! Inbound payment notifications.
//!
//! Providers name their fields differently; the aliases below cover the
//! CinetPay and Orange Money payloads. Nothing here decides whether an order
//! is paid: the claimed status is recorded and logged, never trusted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const REFERENCE_KEYS: &[&str] = &["transaction_id", "cpm_trans_id", "order_id", "txnid"];
const STATUS_KEYS: &[&str] = &["status", "cpm_result"];
const AMOUNT_KEYS: &[&str] = &["amount", "cpm_amount"];
const CURRENCY_KEYS: &[&str] = &["currency", "cpm_currency"];
const SIGNATURE_KEY: &str = "signature";

/// Statuses providers use for a successful payment.
const PAID_CLAIMS: &[&str] = &[
    "PAID",
    "SUCCESS",
    "SUCCESSFUL",
    "COMPLETED",
    "ACCEPTED",
    "CONFIRMED",
    "00",
];

/// Payment provider that sent a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    CinetPay,
    OrangeMoney,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::CinetPay => "cinetpay",
            Provider::OrangeMoney => "orange-money",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cinetpay" => Ok(Provider::CinetPay),
            "orange-money" | "orange_money" | "orangemoney" => Ok(Provider::OrangeMoney),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Why a body could not be turned into a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("body is not a JSON object")]
    MalformedJson,

    #[error("no transaction reference in body")]
    MissingReference,
}

/// Whatever a body claims, before anything is required of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub external_ref: Option<String>,
    pub status: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub signature: Option<String>,
}

impl Claims {
    /// Reads claims out of a JSON object body.
    pub fn from_body(raw: &[u8]) -> Result<Self, NotificationError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|_| NotificationError::MalformedJson)?;
        let Value::Object(map) = value else {
            return Err(NotificationError::MalformedJson);
        };

        Ok(Self {
            external_ref: first_field(&map, REFERENCE_KEYS),
            status: first_field(&map, STATUS_KEYS),
            amount: first_field(&map, AMOUNT_KEYS),
            currency: first_field(&map, CURRENCY_KEYS),
            signature: first_field(&map, &[SIGNATURE_KEY]),
        })
    }

    /// Requires the identifying reference.
    pub fn into_notification(self) -> Result<Notification, NotificationError> {
        let external_ref = self
            .external_ref
            .ok_or(NotificationError::MissingReference)?;
        Ok(Notification {
            external_ref,
            claimed_status: self.status.unwrap_or_default(),
            claimed_amount: self.amount,
            claimed_currency: self.currency,
        })
    }

    /// Message covered by a body-field signature: `ref|status|amount|currency`.
    pub fn field_signing_input(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.external_ref.as_deref().unwrap_or(""),
            self.status.as_deref().unwrap_or(""),
            self.amount.as_deref().unwrap_or(""),
            self.currency.as_deref().unwrap_or(""),
        )
    }
}

/// A notification that names an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub external_ref: String,
    pub claimed_status: String,
    pub claimed_amount: Option<String>,
    pub claimed_currency: Option<String>,
}

impl Notification {
    /// Whether the sender says the payment succeeded. Informational only.
    pub fn claims_paid(&self) -> bool {
        let status = self.claimed_status.trim().to_uppercase();
        PAID_CLAIMS.contains(&status.as_str())
    }
}

/// First non-empty field among `keys`, numbers rendered as written.
fn first_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
