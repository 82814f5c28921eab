//! Payment Settler: charges a payment method for an order amount.
//!
//! A charge runs a bounded sequence of probabilistic settlement attempts
//! with fixed backoff, persists exactly one payment record regardless of
//! outcome, and emits a single outcome notification. Raw cards are
//! exchanged for tokens first; the settler itself only ever settles
//! against a token.

pub mod config;
pub mod error;
pub mod service;

pub use config::SettlementConfig;
pub use error::SettlementError;
pub use service::{ChargeOutcome, ChargeRequest, Settler, TokenProvider};
