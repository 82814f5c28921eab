//! Settler configuration.

use std::time::Duration;

/// Settlement behavior knobs.
///
/// A charge performs at most `max_retries + 1` settlement attempts, so
/// the defaults yield three attempts separated by a fixed 200ms pause.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Probability in `[0, 1]` that a single settlement attempt is
    /// rejected.
    pub rejection_probability: f64,
    /// Additional settlement attempts after the first rejection.
    pub max_retries: u32,
    /// Fixed pause between settlement attempts.
    pub backoff: Duration,
    /// Additional tokenization attempts after the first rejection.
    pub tokenization_max_retries: u32,
    /// Fixed pause between tokenization attempts.
    pub tokenization_backoff: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            rejection_probability: 0.20,
            max_retries: 2,
            backoff: Duration::from_millis(200),
            tokenization_max_retries: 2,
            tokenization_backoff: Duration::from_millis(150),
        }
    }
}
