//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `API_KEY` — shared secret for `X-API-KEY` (default: `"local-dev-key"`)
/// - `CRYPTO_KEY_HEX` — hex-encoded 32-byte AES-256 key for card payloads
/// - `TOKEN_HMAC_SECRET` — enables deterministic tokens when set
/// - `TOKEN_REJECTION_PROB` — tokenizer rejection probability (default: `0.15`)
/// - `PAYMENT_REJECTION_PROB` — per-attempt settlement rejection (default: `0.20`)
/// - `PAYMENT_MAX_RETRIES` / `PAYMENT_BACKOFF_MS` — settlement loop (default: `2` / `200`)
/// - `TOKENIZATION_MAX_RETRIES` / `TOKENIZATION_BACKOFF_MS` — tokenization loop (default: `2` / `150`)
/// - `ORDER_CURRENCY` — currency orders are charged in (default: `"COP"`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory stores when unset
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub crypto_key_hex: String,
    pub token_hmac_secret: Option<String>,
    pub token_rejection_probability: f64,
    pub payment_rejection_probability: f64,
    pub payment_max_retries: u32,
    pub payment_backoff: Duration,
    pub tokenization_max_retries: u32,
    pub tokenization_backoff: Duration,
    pub currency: String,
    pub database_url: Option<String>,
    pub side_effect_capacity: usize,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("HOST", defaults.host),
            port: env_parsed("PORT", defaults.port),
            api_key: env_or("API_KEY", defaults.api_key),
            crypto_key_hex: env_or("CRYPTO_KEY_HEX", defaults.crypto_key_hex),
            token_hmac_secret: std::env::var("TOKEN_HMAC_SECRET").ok(),
            token_rejection_probability: env_parsed(
                "TOKEN_REJECTION_PROB",
                defaults.token_rejection_probability,
            ),
            payment_rejection_probability: env_parsed(
                "PAYMENT_REJECTION_PROB",
                defaults.payment_rejection_probability,
            ),
            payment_max_retries: env_parsed("PAYMENT_MAX_RETRIES", defaults.payment_max_retries),
            payment_backoff: Duration::from_millis(env_parsed("PAYMENT_BACKOFF_MS", 200)),
            tokenization_max_retries: env_parsed(
                "TOKENIZATION_MAX_RETRIES",
                defaults.tokenization_max_retries,
            ),
            tokenization_backoff: Duration::from_millis(env_parsed("TOKENIZATION_BACKOFF_MS", 150)),
            currency: env_or("ORDER_CURRENCY", defaults.currency),
            database_url: std::env::var("DATABASE_URL").ok(),
            side_effect_capacity: env_parsed("SIDE_EFFECT_CAPACITY", defaults.side_effect_capacity),
            log_level: env_or("RUST_LOG", defaults.log_level),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_key: "local-dev-key".to_string(),
            // Development-only key; production deployments must set
            // CRYPTO_KEY_HEX.
            crypto_key_hex: "00".repeat(32),
            token_hmac_secret: None,
            token_rejection_probability: 0.15,
            payment_rejection_probability: 0.20,
            payment_max_retries: 2,
            payment_backoff: Duration::from_millis(200),
            tokenization_max_retries: 2,
            tokenization_backoff: Duration::from_millis(150),
            currency: "COP".to_string(),
            database_url: None,
            side_effect_capacity: 256,
            log_level: "info".to_string(),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.payment_max_retries, 2);
        assert_eq!(config.currency, "COP");
        assert_eq!(config.crypto_key_hex.len(), 64);
        assert!(config.token_hmac_secret.is_none());
    }

    #[test]
    fn addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
