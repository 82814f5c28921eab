//! Persistence ports for orders, payments, and card tokens.
//!
//! Each entity is owned by exactly one service crate; the stores share no
//! transaction with each other. Two implementations ship per port: an
//! in-memory one (tests and default wiring) and a PostgreSQL one.

pub mod error;
pub mod memory;
pub mod orders;
pub mod payments;
pub mod postgres;
pub mod tokens;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderStore, InMemoryPaymentStore, InMemoryTokenStore};
pub use orders::OrderStore;
pub use payments::PaymentStore;
pub use postgres::{PgOrderStore, PgPaymentStore, PgTokenStore, run_migrations};
pub use tokens::TokenStore;
