//! Catalog contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId};

use crate::error::CollaboratorError;

/// Point-in-time price/stock snapshot of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Unit price in minor units.
    pub price: Money,
    pub stock: u32,
}

/// Contract for the external catalog service.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetches a price/stock snapshot. Missing products and lookup
    /// failures both degrade to `None`.
    ///
    /// The snapshot is point-in-time only; no lock is held between this
    /// check and a later [`decrement`](Catalog::decrement).
    async fn snapshot(&self, product_id: ProductId) -> Option<ProductSnapshot>;

    /// Decrements stock after a confirmed payment. Best-effort: errors
    /// are logged by the caller and never compensated against order
    /// state.
    async fn decrement(&self, product_id: ProductId, quantity: u32)
    -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, ProductSnapshot>,
    decrements: Vec<(ProductId, u32)>,
    unavailable: bool,
    fail_on_decrement: bool,
}

/// In-memory catalog for testing and default wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stocks a product with a price and quantity on hand.
    pub fn stock(&self, product_id: ProductId, price: Money, stock: u32) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product_id, ProductSnapshot { price, stock });
    }

    /// Simulates the catalog being unreachable for lookups.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Configures decrement calls to fail.
    pub fn set_fail_on_decrement(&self, fail: bool) {
        self.state.write().unwrap().fail_on_decrement = fail;
    }

    /// Returns every decrement call recorded so far.
    pub fn decrements(&self) -> Vec<(ProductId, u32)> {
        self.state.read().unwrap().decrements.clone()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn snapshot(&self, product_id: ProductId) -> Option<ProductSnapshot> {
        let state = self.state.read().unwrap();
        if state.unavailable {
            tracing::warn!(%product_id, "catalog unreachable, treating product as absent");
            return None;
        }
        state.products.get(&product_id).copied()
    }

    async fn decrement(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_decrement {
            return Err(CollaboratorError::Unavailable(
                "catalog decrement failed".to_string(),
            ));
        }
        if let Some(snapshot) = state.products.get_mut(&product_id) {
            snapshot.stock = snapshot.stock.saturating_sub(quantity);
        }
        state.decrements.push((product_id, quantity));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_and_decrement() {
        let catalog = InMemoryCatalog::new();
        catalog.stock(ProductId::new(1), Money::from_minor(15900), 10);

        let snapshot = catalog.snapshot(ProductId::new(1)).await.unwrap();
        assert_eq!(snapshot.price, Money::from_minor(15900));
        assert_eq!(snapshot.stock, 10);

        catalog.decrement(ProductId::new(1), 3).await.unwrap();
        assert_eq!(catalog.snapshot(ProductId::new(1)).await.unwrap().stock, 7);
        assert_eq!(catalog.decrements(), vec![(ProductId::new(1), 3)]);
    }

    #[tokio::test]
    async fn missing_product_is_absent() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.snapshot(ProductId::new(99)).await.is_none());
    }

    #[tokio::test]
    async fn outage_degrades_to_absent() {
        let catalog = InMemoryCatalog::new();
        catalog.stock(ProductId::new(1), Money::from_minor(100), 5);
        catalog.set_unavailable(true);
        assert!(catalog.snapshot(ProductId::new(1)).await.is_none());
    }
}
