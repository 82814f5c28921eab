//! Shared building blocks for the order-to-payment fulfillment core.

pub mod money;
pub mod random;
pub mod types;

pub use money::Money;
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};
pub use types::{CorrelationId, CustomerId, OrderId, PaymentId, ProductId};
