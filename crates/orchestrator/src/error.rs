//! Orchestrator error types.

use common::{CustomerId, ProductId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

use crate::ports::ChargeError;

/// Errors that can occur while orchestrating an order.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The order request is malformed.
    #[error("invalid order request: {0}")]
    Validation(String),

    /// The customer does not exist (or the directory degraded to absent).
    #[error("customer {0} not found")]
    UnknownCustomer(CustomerId),

    /// A requested product is missing from the catalog (or the catalog
    /// degraded to absent).
    #[error("product {0} not found")]
    UnknownProduct(ProductId),

    /// Requested quantity exceeds the stock snapshot.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Domain rule violation (empty items, zero quantity, overflow).
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Order store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The charge failed hard. The order was finalized to `Failed`
    /// before this error was raised.
    #[error(transparent)]
    Charge(#[from] ChargeError),
}
