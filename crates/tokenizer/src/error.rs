//! Tokenizer error types.

use domain::CardError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during tokenization.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Card data failed validation.
    #[error(transparent)]
    Card(#[from] CardError),

    /// AEAD encryption failed. No card detail is attached.
    #[error("payload encryption failed")]
    Encryption,

    /// The configured AES key is unusable.
    #[error("invalid crypto key: {0}")]
    InvalidKey(String),

    /// Token store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A duplicate insert conflicted but the winning row could not be
    /// re-read. Indicates a store-level inconsistency.
    #[error("token conflicted on insert but was not found on re-read")]
    ConflictVanished,
}
