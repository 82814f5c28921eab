//! Card Tokenizer: issues payment tokens from raw card data.
//!
//! Owns the encryption of card payloads and the idempotency of token
//! records. Tokenization is probabilistically rejected (simulating an
//! acquirer), and issuance follows one unified path: derive key, look
//! up, else create — resolving concurrent duplicates through the store's
//! uniqueness conflict.

pub mod config;
pub mod crypto;
pub mod error;
pub mod service;

pub use config::TokenizerConfig;
pub use crypto::{CardCipher, derive_token, random_token};
pub use error::TokenizerError;
pub use service::{TokenizationOutcome, Tokenizer};
