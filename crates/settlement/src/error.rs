//! Settlement error types.

use domain::CardError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while charging a payment.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The charge request is malformed.
    #[error("invalid charge request: {0}")]
    Validation(String),

    /// Raw card data failed validation.
    #[error(transparent)]
    Card(#[from] CardError),

    /// Every settlement attempt was rejected. A rejected payment record
    /// was persisted before this error is raised.
    #[error("payment rejected after {attempts} settlement attempts")]
    Rejected { attempts: u32 },

    /// The tokenizer rejected the card on every attempt. No payment
    /// record exists for the charge.
    #[error("card tokenization rejected after {attempts} attempts")]
    TokenizationRejected { attempts: u32 },

    /// The tokenizer failed for a non-card reason (crypto, storage).
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// Payment store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
