//! Customer directory contract and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CustomerId;

/// Contract for the external customer directory.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Returns whether the customer exists.
    ///
    /// Policy: every failure reaching the directory (timeout, error
    /// status, unreachable) degrades to `false`, so directory outages
    /// surface as validation failures rather than upstream errors.
    async fn exists(&self, customer_id: CustomerId) -> bool;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    customers: HashSet<CustomerId>,
    unavailable: bool,
}

/// In-memory customer directory for testing and default wiring.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryCustomerDirectory {
    /// Creates a new empty in-memory directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer ID as existing.
    pub fn register(&self, customer_id: CustomerId) {
        self.state.write().unwrap().customers.insert(customer_id);
    }

    /// Simulates the directory being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn exists(&self, customer_id: CustomerId) -> bool {
        let state = self.state.read().unwrap();
        if state.unavailable {
            tracing::warn!(%customer_id, "customer directory unreachable, treating as absent");
            return false;
        }
        state.customers.contains(&customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_customer_exists() {
        let directory = InMemoryCustomerDirectory::new();
        directory.register(CustomerId::new(42));
        assert!(directory.exists(CustomerId::new(42)).await);
        assert!(!directory.exists(CustomerId::new(7)).await);
    }

    #[tokio::test]
    async fn outage_degrades_to_absent() {
        let directory = InMemoryCustomerDirectory::new();
        directory.register(CustomerId::new(42));
        directory.set_unavailable(true);
        assert!(!directory.exists(CustomerId::new(42)).await);
    }
}
