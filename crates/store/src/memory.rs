//! In-memory store implementations for testing and default wiring.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, PaymentId};
use domain::{CardToken, Order, OrderStatus, Payment};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::orders::OrderStore;
use crate::payments::PaymentStore;
use crate::tokens::TokenStore;

/// In-memory order store.
///
/// Provides the same interface and transition discipline as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn finalize(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(StoreError::OrderNotFound(id))?;
        order.finalize(status)?;
        Ok(order.clone())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }
}

/// In-memory payment store.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }

    /// Returns all payments recorded for an order reference.
    pub async fn payments_for_order(&self, order_ref: &str) -> Vec<Payment> {
        self.payments
            .read()
            .await
            .values()
            .filter(|p| p.order_ref == order_ref)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }
}

/// In-memory token store.
///
/// The uniqueness check and the insert happen under one write lock, so
/// concurrent duplicate inserts observe the same conflict the unique
/// index produces in PostgreSQL.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, CardToken>>>,
}

impl InMemoryTokenStore {
    /// Creates a new empty in-memory token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored token rows.
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: &CardToken) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token) {
            return Err(StoreError::DuplicateToken);
        }
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<CardToken>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}
