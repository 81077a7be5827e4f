//! Download tokens.
//!
//! A read token lets its holder see an order's deliverables until it expires
//! and may be presented any number of times. A consumable token also carries
//! a use ceiling and is spent on each successful presentation.

use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, Timestamp, TokenId};
use crate::domain::payment::Order;

/// Random bytes per token value.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Read,
    Consumable,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Read => "read",
            TokenKind::Consumable => "consumable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(TokenKind::Read),
            "consumable" => Some(TokenKind::Consumable),
            _ => None,
        }
    }
}

/// Validity of a token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Expired,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadToken {
    pub id: TokenId,
    pub order_id: OrderId,
    pub value: String,
    pub kind: TokenKind,
    pub expires_at: Timestamp,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub created_at: Timestamp,
}

impl DownloadToken {
    /// Mints a reusable read token for a paid order.
    pub fn mint_read(order_id: OrderId, ttl: Duration, now: Timestamp) -> Self {
        Self::mint(order_id, TokenKind::Read, ttl, None, now)
    }

    /// Mints a token that is spent after `max_uses` presentations.
    pub fn mint_consumable(order_id: OrderId, ttl: Duration, max_uses: i32, now: Timestamp) -> Self {
        Self::mint(order_id, TokenKind::Consumable, ttl, Some(max_uses.max(1)), now)
    }

    fn mint(
        order_id: OrderId,
        kind: TokenKind,
        ttl: Duration,
        max_uses: Option<i32>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TokenId::new(),
            order_id,
            value: generate_token_value(),
            kind,
            expires_at: now.plus(ttl),
            max_uses,
            used_count: 0,
            created_at: now,
        }
    }

    pub fn state_at(&self, now: Timestamp) -> TokenState {
        if !now.is_before(&self.expires_at) {
            return TokenState::Expired;
        }
        match self.max_uses {
            Some(max) if self.used_count >= max => TokenState::Exhausted,
            _ => TokenState::Valid,
        }
    }

    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.state_at(now) == TokenState::Valid
    }

    pub fn remaining_uses(&self) -> Option<i32> {
        self.max_uses.map(|max| (max - self.used_count).max(0))
    }
}

/// Outcome of presenting a token value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Redeemed { order: Order, token: DownloadToken },
    Expired,
    Invalid,
    NotFound,
}

/// 64 lowercase hex characters from the OS CSPRNG.
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cheap shape check before any lookup.
pub fn is_well_formed(value: &str) -> bool {
    value.len() == TOKEN_BYTES * 2
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
