//! Order aggregate.
//!
//! Amount and currency are set once at checkout from the catalog price and
//! there is no method that changes them afterwards. The external reference
//! is likewise fixed at construction.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

use crate::domain::foundation::{
    normalize_email, OrderId, StateMachine, Timestamp, ValidationError,
};

use super::errors::PaymentError;
use super::status::OrderStatus;

/// A purchase intent for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub product_sku: String,
    pub email: String,
    /// Amount in the currency's smallest unit (XOF has none, so this is FCFA).
    pub amount: i64,
    pub currency: String,
    pub external_ref: String,
    pub status: OrderStatus,
    pub provider_transaction_id: Option<String>,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
}

/// Result of comparing notification claims against the stored price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountCheck {
    Matches,
    NotClaimed,
    Mismatch {
        claimed_amount: Option<String>,
        claimed_currency: Option<String>,
    },
}

impl Order {
    /// Creates an order in `Created` with a fresh external reference.
    pub fn new(
        product_sku: impl Into<String>,
        email: &str,
        amount: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Self::with_reference(product_sku, email, amount, currency, generate_external_ref(), now)
    }

    /// Creates an order in `Created` with a caller-chosen external reference.
    pub fn with_reference(
        product_sku: impl Into<String>,
        email: &str,
        amount: i64,
        currency: impl Into<String>,
        external_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let product_sku = product_sku.into();
        let currency = currency.into().trim().to_uppercase();
        let external_ref = external_ref.into().trim().to_string();

        if product_sku.trim().is_empty() {
            return Err(ValidationError::empty_field("product_sku"));
        }
        let email = normalize_email(email)
            .ok_or_else(|| ValidationError::invalid_format("email", "not an email address"))?;
        if amount <= 0 {
            return Err(ValidationError::invalid_format("amount", "must be positive"));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format("currency", "expected ISO 4217 code"));
        }
        if external_ref.is_empty() {
            return Err(ValidationError::empty_field("external_ref"));
        }

        Ok(Self {
            id: OrderId::new(),
            product_sku,
            email,
            amount,
            currency,
            external_ref,
            status: OrderStatus::Created,
            provider_transaction_id: None,
            created_at: now,
            paid_at: None,
            delivered_at: None,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }

    /// Payment was handed to the provider.
    pub fn begin_payment(&mut self) -> Result<(), PaymentError> {
        self.status = self.status.transition_to(OrderStatus::Pending)?;
        Ok(())
    }

    /// Records the provider's confirmation. A `Created` order passes through
    /// `Pending` first.
    pub fn mark_paid(
        &mut self,
        provider_transaction_id: Option<String>,
        now: Timestamp,
    ) -> Result<(), PaymentError> {
        if self.status == OrderStatus::Created {
            self.begin_payment()?;
        }
        self.status = self.status.transition_to(OrderStatus::Paid)?;
        self.provider_transaction_id = provider_transaction_id;
        self.paid_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        if self.status == OrderStatus::Created {
            self.begin_payment()?;
        }
        if self.status == OrderStatus::Failed {
            return Ok(());
        }
        self.status = self.status.transition_to(OrderStatus::Failed)?;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), PaymentError> {
        self.status = self.status.transition_to(OrderStatus::Canceled)?;
        Ok(())
    }

    /// Delivered is a sub-state of `Paid`; it never changes `status`.
    pub fn mark_delivered(&mut self, now: Timestamp) -> Result<(), PaymentError> {
        if !self.is_paid() {
            return Err(PaymentError::NotPaid(self.id.to_string()));
        }
        if self.delivered_at.is_none() {
            self.delivered_at = Some(now);
        }
        Ok(())
    }

    /// Compares amount/currency claimed by a notification with the stored price.
    pub fn check_claimed_amount(
        &self,
        claimed_amount: Option<&str>,
        claimed_currency: Option<&str>,
    ) -> AmountCheck {
        if claimed_amount.is_none() && claimed_currency.is_none() {
            return AmountCheck::NotClaimed;
        }
        let amount_ok = claimed_amount
            .map(|a| parse_whole_amount(a) == Some(self.amount))
            .unwrap_or(true);
        let currency_ok = claimed_currency
            .map(|c| c.trim().eq_ignore_ascii_case(&self.currency))
            .unwrap_or(true);
        if amount_ok && currency_ok {
            AmountCheck::Matches
        } else {
            AmountCheck::Mismatch {
                claimed_amount: claimed_amount.map(str::to_string),
                claimed_currency: claimed_currency.map(str::to_string),
            }
        }
    }
}

/// Random, unguessable provider reference: `TXN-` and 24 uppercase hex digits.
pub fn generate_external_ref() -> String {
    let mut bytes = [0u8; 12];
    OsRng.fill_bytes(&mut bytes);
    format!("TXN-{}", hex::encode_upper(bytes))
}

/// Parses "15000", "15000.00" or "15 000"; fractional units are rejected.
fn parse_whole_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if !fraction.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::with_reference("EBOOK_ASP", "Buyer@Example.com", 15000, "xof", "TXN-1", Timestamp::now())
            .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_order_normalizes_fields() {
        let order = order();
        assert_eq!(order.email, "buyer@example.com");
        assert_eq!(order.currency, "XOF");
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn new_order_rejects_bad_input() {
        let now = Timestamp::now();
        assert!(Order::new("SKU", "not-an-email", 100, "XOF", now).is_err());
        assert!(Order::new("SKU", "a@b.co", 0, "XOF", now).is_err());
        assert!(Order::new("SKU", "a@b.co", 100, "FCFA", now).is_err());
        assert!(Order::new("", "a@b.co", 100, "XOF", now).is_err());
    }

    #[test]
    fn generated_references_are_unique_and_shaped() {
        let a = generate_external_ref();
        let b = generate_external_ref();
        assert_ne!(a, b);
        assert!(a.starts_with("TXN-"));
        assert_eq!(a.len(), 4 + 24);
    }

    // ══════════════════════════════════════════════════════════════
    // Lifecycle
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn mark_paid_from_created_goes_through_pending() {
        let mut order = order();
        order.mark_paid(Some("P-1".into()), Timestamp::now()).unwrap();
        assert!(order.is_paid());
        assert_eq!(order.provider_transaction_id.as_deref(), Some("P-1"));
        assert!(order.paid_at.is_some());
    }

    #[test]
    fn mark_paid_twice_is_rejected() {
        let mut order = order();
        order.mark_paid(None, Timestamp::now()).unwrap();
        let err = order.mark_paid(None, Timestamp::now()).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::InvalidTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Paid
            }
        ));
    }

    #[test]
    fn failed_order_can_later_be_paid() {
        let mut order = order();
        order.begin_payment().unwrap();
        order.mark_failed().unwrap();
        order.mark_failed().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        order.mark_paid(None, Timestamp::now()).unwrap();
        assert!(order.is_paid());
    }

    #[test]
    fn delivered_requires_paid_and_keeps_first_time() {
        let mut order = order();
        assert!(order.mark_delivered(Timestamp::now()).is_err());

        order.mark_paid(None, Timestamp::now()).unwrap();
        let first = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        order.mark_delivered(first).unwrap();
        order.mark_delivered(Timestamp::now()).unwrap();
        assert_eq!(order.delivered_at, Some(first));
        assert_eq!(order.status, OrderStatus::Paid);
    }

    // ══════════════════════════════════════════════════════════════
    // Amount claims
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn claimed_amount_variants_match() {
        let order = order();
        assert_eq!(order.check_claimed_amount(Some("15000"), Some("XOF")), AmountCheck::Matches);
        assert_eq!(order.check_claimed_amount(Some("15000.00"), None), AmountCheck::Matches);
        assert_eq!(order.check_claimed_amount(Some("15 000"), Some("xof")), AmountCheck::Matches);
        assert_eq!(order.check_claimed_amount(None, None), AmountCheck::NotClaimed);
    }

    #[test]
    fn claimed_amount_mismatch_is_reported() {
        let order = order();
        assert!(matches!(
            order.check_claimed_amount(Some("100"), Some("XOF")),
            AmountCheck::Mismatch { .. }
        ));
        assert!(matches!(
            order.check_claimed_amount(Some("15000"), Some("EUR")),
            AmountCheck::Mismatch { .. }
        ));
        assert!(matches!(
            order.check_claimed_amount(Some("15000.50"), None),
            AmountCheck::Mismatch { .. }
        ));
    }
}
