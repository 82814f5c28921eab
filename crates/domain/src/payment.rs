//! Payment records and the token-or-card payment method.

use chrono::{DateTime, Utc};
use common::{Money, PaymentId};
use serde::{Deserialize, Serialize};

use crate::card::CardData;

/// Terminal status of a charge attempt sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Approved,
    Rejected,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// Exactly one of a previously issued token or raw card data.
///
/// The XOR the wire contract states in prose is structural here; request
/// parsing at the API edge is the only place that deals with both fields.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentMethod {
    Token(String),
    Card(CardData),
}

impl PaymentMethod {
    /// Builds a method from the optional wire fields, enforcing that
    /// exactly one is present.
    pub fn from_parts(
        token: Option<String>,
        card: Option<CardData>,
    ) -> Result<Self, crate::OrderError> {
        let token = token.filter(|t| !t.trim().is_empty());
        match (token, card) {
            (Some(token), None) => Ok(PaymentMethod::Token(token)),
            (None, Some(card)) => Ok(PaymentMethod::Card(card)),
            (None, None) => Err(crate::OrderError::PaymentMethodRequired),
            (Some(_), Some(_)) => Err(crate::OrderError::AmbiguousPaymentMethod),
        }
    }
}

/// A persisted payment record.
///
/// `order_ref` is a correlation key, not a foreign key; payment and order
/// live in separate failure domains. Written exactly once per charge
/// attempt sequence regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_ref: String,
    pub amount: Money,
    pub currency: String,
    pub token: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
    /// Present only when the charge was approved.
    pub auth_code: Option<String>,
    /// Settlement attempts performed, always >= 1.
    pub attempts: u32,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
