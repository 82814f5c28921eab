//! Bounded fire-and-forget dispatch for audit and notification traffic.
//!
//! Primary operations enqueue side effects with `try_send` and move on;
//! a single worker task drains the queue and talks to the collaborators.
//! A full or closed queue drops the effect with a warning instead of
//! exerting backpressure on the request path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::audit::{AuditEvent, AuditSink};
use crate::notification::{NotificationGateway, PaymentNotification};

/// Cap on how long one collaborator call may hold the worker.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

enum SideEffect {
    Audit(AuditEvent),
    Notify(PaymentNotification),
    Flush(oneshot::Sender<()>),
}

/// Cheap handle for enqueueing side effects. Cloned into every service.
#[derive(Clone)]
pub struct SideEffects {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffects {
    /// Enqueues an audit event. Never blocks; drops on overflow.
    pub fn audit(&self, event: AuditEvent) {
        self.enqueue(SideEffect::Audit(event), "audit");
    }

    /// Enqueues a notification. Never blocks; drops on overflow.
    pub fn notify(&self, notification: PaymentNotification) {
        self.enqueue(SideEffect::Notify(notification), "notification");
    }

    /// Waits until every effect enqueued before this call has been
    /// handed to its collaborator. Used by tests and shutdown.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(SideEffect::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    fn enqueue(&self, effect: SideEffect, kind: &'static str) {
        if self.tx.try_send(effect).is_err() {
            metrics::counter!("side_effects_dropped_total", "kind" => kind).increment(1);
            tracing::warn!(kind, "side-effect queue full or closed, dropping event");
        }
    }
}

/// Owns the worker task draining the side-effect queue.
pub struct SideEffectsWorker {
    handle: JoinHandle<()>,
}

impl SideEffectsWorker {
    /// Aborts the worker. Pending effects are discarded; they are
    /// best-effort by contract.
    pub fn shutdown(self) {
        self.handle.abort();
    }
}

/// Spawns the side-effect worker and returns the enqueue handle.
pub fn spawn_side_effects(
    audit: Arc<dyn AuditSink>,
    notifications: Arc<dyn NotificationGateway>,
    capacity: usize,
) -> (SideEffects, SideEffectsWorker) {
    let (tx, mut rx) = mpsc::channel(capacity);

    let handle = tokio::spawn(async move {
        while let Some(effect) = rx.recv().await {
            match effect {
                SideEffect::Audit(event) => {
                    let event_type = event.event_type.clone();
                    let result =
                        tokio::time::timeout(DISPATCH_TIMEOUT, audit.record(event)).await;
                    match result {
                        Ok(Ok(())) => {
                            metrics::counter!("audit_events_total").increment(1);
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(event_type, error = %e, "audit record failed, discarding");
                        }
                        Err(_) => {
                            tracing::warn!(event_type, "audit record timed out, discarding");
                        }
                    }
                }
                SideEffect::Notify(notification) => {
                    let event_type = notification.event_type.clone();
                    let result =
                        tokio::time::timeout(DISPATCH_TIMEOUT, notifications.send(notification))
                            .await;
                    match result {
                        Ok(Ok(())) => {
                            metrics::counter!("notifications_sent_total").increment(1);
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(event_type, error = %e, "notification send failed, discarding");
                        }
                        Err(_) => {
                            tracing::warn!(event_type, "notification send timed out, discarding");
                        }
                    }
                }
                SideEffect::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    });

    (SideEffects { tx }, SideEffectsWorker { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::notification::InMemoryNotificationGateway;
    use common::{CorrelationId, Money};
    use serde_json::json;

    fn notification() -> PaymentNotification {
        PaymentNotification {
            event_type: "PAYMENT_FAILED".to_string(),
            order_ref: "ORD-1".to_string(),
            email: None,
            amount: Money::from_minor(500),
            currency: "COP".to_string(),
            attempts: 3,
            status: "REJECTED".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatches_audit_and_notifications() {
        let sink = InMemoryAuditSink::new();
        let gateway = InMemoryNotificationGateway::new();
        let (side_effects, worker) =
            spawn_side_effects(Arc::new(sink.clone()), Arc::new(gateway.clone()), 16);

        let correlation = CorrelationId::from_header("tx-9");
        side_effects.audit(AuditEvent::new(
            &correlation,
            "payments",
            "PAYMENT.REJECTED",
            Some("ORD-1".to_string()),
            json!({"attempts": 3}),
        ));
        side_effects.notify(notification());
        side_effects.flush().await;

        assert_eq!(sink.events_of_type("PAYMENT.REJECTED").len(), 1);
        assert_eq!(gateway.sent().len(), 1);
        worker.shutdown();
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = InMemoryAuditSink::new();
        sink.set_fail_on_record(true);
        let gateway = InMemoryNotificationGateway::new();
        let (side_effects, worker) =
            spawn_side_effects(Arc::new(sink.clone()), Arc::new(gateway.clone()), 16);

        let correlation = CorrelationId::new();
        side_effects.audit(AuditEvent::new(
            &correlation,
            "orders",
            "ORDER.CREATED",
            None,
            json!({}),
        ));
        // Still able to flush and keep dispatching afterwards.
        side_effects.flush().await;
        side_effects.notify(notification());
        side_effects.flush().await;

        assert!(sink.events().is_empty());
        assert_eq!(gateway.sent().len(), 1);
        worker.shutdown();
    }
}
