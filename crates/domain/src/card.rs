//! Card data, brand detection, and issued token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// Card brand detected from the PAN prefix.
///
/// Prefix detection only; BIN/IIN tables are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Unknown,
}

impl CardBrand {
    /// Detects the brand from the PAN prefix: leading `4` is Visa,
    /// `51`-`55` Mastercard, `34`/`37` Amex, anything else unknown.
    pub fn detect(pan: &str) -> Self {
        let mut chars = pan.chars();
        match (chars.next(), chars.next()) {
            (Some('4'), _) => CardBrand::Visa,
            (Some('5'), Some(second)) if ('1'..='5').contains(&second) => CardBrand::Mastercard,
            (Some('3'), Some('4')) | (Some('3'), Some('7')) => CardBrand::Amex,
            _ => CardBrand::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MASTERCARD",
            CardBrand::Amex => "AMEX",
            CardBrand::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CardBrand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VISA" => Ok(CardBrand::Visa),
            "MASTERCARD" => Ok(CardBrand::Mastercard),
            "AMEX" => Ok(CardBrand::Amex),
            "UNKNOWN" => Ok(CardBrand::Unknown),
            other => Err(format!("unknown card brand: {other}")),
        }
    }
}

/// Returns the last four digits of the PAN (or the whole PAN if shorter).
///
/// Counts characters, not bytes, so masking stays safe even for input
/// that has not been through `validate` yet.
pub fn last4(pan: &str) -> String {
    let tail: Vec<char> = pan.chars().rev().take(4).collect();
    tail.into_iter().rev().collect()
}

/// Raw card data as submitted by a client. The CVV is used for
/// validation only and is never persisted anywhere.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub pan: String,
    pub cvv: String,
    pub exp_month: u8,
    pub exp_year: u16,
    pub name: String,
}

impl CardData {
    /// Validates PAN shape (12-19 digits + Luhn), expiration window,
    /// CVV format for the detected brand, and a non-blank holder name.
    pub fn validate(&self) -> Result<(), CardError> {
        if self.pan.len() < 12 || self.pan.len() > 19 || !luhn(&self.pan) {
            return Err(CardError::InvalidPan);
        }
        if !(1..=12).contains(&self.exp_month) || !(2024..=2100).contains(&self.exp_year) {
            return Err(CardError::InvalidExpiry);
        }
        let expected_cvv_len = match CardBrand::detect(&self.pan) {
            CardBrand::Amex => 4,
            _ => 3,
        };
        if self.cvv.len() != expected_cvv_len || !self.cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::InvalidCvv);
        }
        if self.name.trim().is_empty() {
            return Err(CardError::HolderNameRequired);
        }
        Ok(())
    }

    pub fn brand(&self) -> CardBrand {
        CardBrand::detect(&self.pan)
    }

    pub fn last4(&self) -> String {
        last4(&self.pan)
    }
}

// Keep PANs out of logs and error chains.
impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("pan", &format!("****{}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .finish_non_exhaustive()
    }
}

fn luhn(pan: &str) -> bool {
    let mut sum = 0u32;
    let mut alternate = false;
    for c in pan.chars().rev() {
        let Some(mut n) = c.to_digit(10) else {
            return false;
        };
        if alternate {
            n *= 2;
            if n > 9 {
                n -= 9;
            }
        }
        sum += n;
        alternate = !alternate;
    }
    sum % 10 == 0
}

/// Status of a tokenization outcome. Only `Issued` records are ever
/// persisted; a rejection leaves no trace in the token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Issued,
    Rejected,
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenStatus::Issued => "ISSUED",
            TokenStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// A persisted card token. The payload is AES-GCM ciphertext of
/// `pan|MM/YYYY|name`; the CVV is excluded before encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardToken {
    /// Unique token value, derived (deterministic mode) or random.
    pub token: String,
    pub last4: String,
    pub brand: CardBrand,
    pub encrypted_payload: Vec<u8>,
    /// Hex-encoded 12-byte nonce, freshly generated per encryption.
    pub nonce_hex: String,
    pub status: TokenStatus,
    pub created_at: DateTime<Utc>,
}
