//! Order Orchestrator: drives an order from request to terminal status.
//!
//! The orchestrator validates and prices a request against the catalog,
//! persists the order as its durability checkpoint, charges it through
//! the payments port, and finalizes the status exactly once. There is no
//! distributed transaction anywhere; consistency comes from that
//! ordering and the order status state machine.

pub mod config;
pub mod error;
pub mod ports;
pub mod service;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use ports::{ChargeError, ChargeResult, ChargeSpec, PaymentsPort};
pub use service::{CreateOrderRequest, OrderItem, OrderReceipt, Orchestrator};
