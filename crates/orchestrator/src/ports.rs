//! Payments port: the orchestrator's contract with the settler.

use async_trait::async_trait;
use common::{CorrelationId, Money};
use domain::PaymentMethod;
use thiserror::Error;

/// A charge the orchestrator hands to the settler.
#[derive(Debug, Clone)]
pub struct ChargeSpec {
    pub order_ref: String,
    pub amount: Money,
    pub currency: String,
    pub method: PaymentMethod,
    pub customer_email: Option<String>,
}

/// Terminal outcome of a completed charge attempt sequence.
///
/// Rejection after exhausted retries is a normal result here, not an
/// error: the orchestrator finalizes the order to `Failed` and the
/// request still succeeds. Errors are reserved for charges that never
/// ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeResult {
    Approved { attempts: u32, auth_code: String },
    Rejected { attempts: u32 },
}

/// A charge that did not run to a settlement decision.
#[derive(Debug, Error)]
pub enum ChargeError {
    /// The settler refused the request as malformed.
    #[error("charge rejected as invalid: {0}")]
    Invalid(String),

    /// The card could not be tokenized (rejected after retries).
    #[error("payment method unprocessable: {0}")]
    Unprocessable(String),

    /// Settlement infrastructure failure.
    #[error("payment settlement unavailable: {0}")]
    Upstream(String),
}

/// Contract for executing charges. The production implementation wraps
/// the settler service; tests script results directly.
#[async_trait]
pub trait PaymentsPort: Send + Sync {
    async fn charge(
        &self,
        correlation: &CorrelationId,
        spec: ChargeSpec,
    ) -> Result<ChargeResult, ChargeError>;
}
