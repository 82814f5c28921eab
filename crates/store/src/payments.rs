//! Payment persistence port.

use async_trait::async_trait;
use common::PaymentId;
use domain::Payment;

use crate::error::Result;

/// Storage port for payment records, owned exclusively by the settler.
///
/// Payments are written exactly once per charge attempt sequence and are
/// never updated; a rejected charge still leaves an audit-grade record.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a finished payment record.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    /// Loads a payment record by ID.
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
}
