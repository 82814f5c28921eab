//! Audit trail contract and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CorrelationId;
use serde::Serialize;

use crate::error::CollaboratorError;

/// An audit trail event. The core only produces these; it never reads
/// them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Join key for every audit record of one inbound request.
    pub correlation_id: String,
    /// Originating service name (`orders`, `payments`, `tokenization`).
    pub service: String,
    /// Milestone name, e.g. `ORDER.CREATED` or `PAYMENT.REJECTED`.
    pub event_type: String,
    pub order_ref: Option<String>,
    pub entity_ref: Option<String>,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Builds an event stamped with the current time.
    pub fn new(
        correlation: &CorrelationId,
        service: &str,
        event_type: &str,
        order_ref: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            correlation_id: correlation.as_str().to_string(),
            service: service.to_string(),
            event_type: event_type.to_string(),
            order_ref,
            entity_ref: None,
            payload,
            at: Utc::now(),
        }
    }
}

/// Contract for the external audit log service. Recording is
/// best-effort: errors are swallowed, never retried, and a bounded
/// timeout caps how long a record call may take.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    events: Vec<AuditEvent>,
    fail_on_record: bool,
}

/// In-memory audit sink recording every event.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemoryAuditSink {
    /// Creates a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures record calls to fail.
    pub fn set_fail_on_record(&self, fail: bool) {
        self.state.write().unwrap().fail_on_record = fail;
    }

    /// Returns every recorded event.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.state.read().unwrap().events.clone()
    }

    /// Returns recorded events of one type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<AuditEvent> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), CollaboratorError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_record {
            return Err(CollaboratorError::Unavailable(
                "audit service down".to_string(),
            ));
        }
        state.events.push(event);
        Ok(())
    }
}
