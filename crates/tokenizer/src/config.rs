//! Tokenizer configuration.

/// Tokenizer behavior knobs.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    /// Probability in `[0, 1]` that a tokenization is rejected before
    /// any persistence happens.
    pub rejection_probability: f64,
    /// Keyed-hash secret for deterministic token derivation. `None`
    /// switches to random (non-idempotent) tokens.
    pub hmac_secret: Option<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            rejection_probability: 0.15,
            hmac_secret: None,
        }
    }
}
