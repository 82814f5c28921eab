//! Collaborator contracts and in-memory implementations.
//!
//! The catalog, customer directory, notification, and audit services are
//! external; only their narrow contracts live here, together with
//! recording in-memory implementations used for tests and default wiring.
//! Audit and notification dispatch go through a bounded queue so their
//! failure or latency can never affect a primary operation.

pub mod audit;
pub mod catalog;
pub mod customers;
pub mod dispatch;
pub mod error;
pub mod notification;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink};
pub use catalog::{Catalog, InMemoryCatalog, ProductSnapshot};
pub use customers::{CustomerDirectory, InMemoryCustomerDirectory};
pub use dispatch::{SideEffects, SideEffectsWorker, spawn_side_effects};
pub use error::CollaboratorError;
pub use notification::{InMemoryNotificationGateway, NotificationGateway, PaymentNotification};
