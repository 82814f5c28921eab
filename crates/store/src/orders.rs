//! Order persistence port.

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus};

use crate::error::Result;

/// Storage port for orders, owned exclusively by the orchestrator.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order together with its lines in one local
    /// transaction. This is the durability checkpoint of the saga: once
    /// this returns, the order exists regardless of downstream outcome.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Applies the single `Created -> {Paid, Failed}` transition and
    /// persists it, returning the updated order. Finalizing an order that
    /// is not in `Created` is a domain error, never a silent overwrite.
    async fn finalize(&self, id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Loads an order with its lines.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
}
