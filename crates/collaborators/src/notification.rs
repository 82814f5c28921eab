//! Notification gateway contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Money;

use crate::error::CollaboratorError;

/// A payment outcome notification, rendered and delivered externally.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    /// `PAYMENT_SUCCEEDED` or `PAYMENT_FAILED`.
    pub event_type: String,
    pub order_ref: String,
    pub email: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub attempts: u32,
    /// Final payment status as reported to the customer.
    pub status: String,
}

/// Contract for the external notification service. Delivery is
/// best-effort; callers swallow errors and never retry.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, notification: PaymentNotification) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sent: Vec<PaymentNotification>,
    fail_on_send: bool,
}

/// In-memory notification gateway recording every dispatch.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryNotificationGateway {
    /// Creates a new recording gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures send calls to fail.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns every notification sent so far.
    pub fn sent(&self) -> Vec<PaymentNotification> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotificationGateway {
    async fn send(&self, notification: PaymentNotification) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_send {
            return Err(CollaboratorError::Unavailable(
                "notification service down".to_string(),
            ));
        }
        state.sent.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> PaymentNotification {
        PaymentNotification {
            event_type: "PAYMENT_SUCCEEDED".to_string(),
            order_ref: "ORD-1".to_string(),
            email: Some("jane@example.com".to_string()),
            amount: Money::from_minor(1000),
            currency: "COP".to_string(),
            attempts: 1,
            status: "APPROVED".to_string(),
        }
    }

    #[tokio::test]
    async fn records_sent_notifications() {
        let gateway = InMemoryNotificationGateway::new();
        gateway.send(notification()).await.unwrap();
        assert_eq!(gateway.sent().len(), 1);
        assert_eq!(gateway.sent()[0].event_type, "PAYMENT_SUCCEEDED");
    }

    #[tokio::test]
    async fn fail_toggle_errors() {
        let gateway = InMemoryNotificationGateway::new();
        gateway.set_fail_on_send(true);
        assert!(gateway.send(notification()).await.is_err());
        assert!(gateway.sent().is_empty());
    }
}
