//! Domain layer: orders, payments, and card tokens.
//!
//! Entities here carry the state-machine and arithmetic invariants of the
//! fulfillment saga; orchestration and persistence live in the service and
//! store crates.

pub mod card;
pub mod error;
pub mod order;
pub mod payment;

pub use card::{CardBrand, CardData, CardToken, TokenStatus, last4};
pub use error::{CardError, OrderError};
pub use order::{Order, OrderLine, OrderStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
