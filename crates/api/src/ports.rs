//! Adapter from the orchestrator's payments port to the settler.

use std::sync::Arc;

use async_trait::async_trait;
use common::CorrelationId;
use orchestrator::{ChargeError, ChargeResult, ChargeSpec, PaymentsPort};
use settlement::{ChargeRequest, SettlementError, Settler};

/// In-process payments port backed by the settler service.
///
/// The settler treats exhausted rejection as a hard error; for the
/// orchestrator it is a normal saga outcome, so it is folded back into
/// [`ChargeResult::Rejected`] here.
pub struct SettlerPort {
    settler: Arc<Settler>,
}

impl SettlerPort {
    pub fn new(settler: Arc<Settler>) -> Self {
        Self { settler }
    }
}

#[async_trait]
impl PaymentsPort for SettlerPort {
    async fn charge(
        &self,
        correlation: &CorrelationId,
        spec: ChargeSpec,
    ) -> Result<ChargeResult, ChargeError> {
        let request = ChargeRequest {
            order_ref: spec.order_ref,
            amount: spec.amount,
            currency: spec.currency,
            method: spec.method,
            customer_email: spec.customer_email,
        };
        match self.settler.charge(correlation, request).await {
            Ok(outcome) => Ok(ChargeResult::Approved {
                attempts: outcome.attempts,
                auth_code: outcome.auth_code,
            }),
            Err(SettlementError::Rejected { attempts }) => Ok(ChargeResult::Rejected { attempts }),
            Err(SettlementError::Validation(message)) => Err(ChargeError::Invalid(message)),
            Err(SettlementError::Card(e)) => Err(ChargeError::Invalid(e.to_string())),
            Err(e @ SettlementError::TokenizationRejected { .. }) => {
                Err(ChargeError::Unprocessable(e.to_string()))
            }
            Err(e) => Err(ChargeError::Upstream(e.to_string())),
        }
    }
}
