//! Store error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order exists with the given ID.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A token row with the same value already exists. This is the
    /// expected signal under concurrent duplicate tokenization and is
    /// resolved by re-reading, never surfaced to clients.
    #[error("duplicate token value")]
    DuplicateToken,

    /// A domain invariant rejected the write (e.g. finalizing an order
    /// that already reached a terminal status).
    #[error(transparent)]
    Domain(#[from] domain::OrderError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
