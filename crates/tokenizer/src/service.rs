//! Tokenization service.

use std::sync::Arc;

use chrono::Utc;
use common::RandomSource;
use domain::{CardBrand, CardData, CardToken, TokenStatus};
use store::{StoreError, TokenStore};

use crate::config::TokenizerConfig;
use crate::crypto::{CardCipher, derive_token, random_token};
use crate::error::TokenizerError;

/// Result of a tokenization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizationOutcome {
    /// A token exists for the card (fresh or idempotently re-served).
    Issued {
        token: String,
        last4: String,
        brand: CardBrand,
    },
    /// The acquirer rejected the card; nothing was persisted.
    Rejected { last4: String, brand: CardBrand },
}

/// Card tokenization service.
pub struct Tokenizer {
    store: Arc<dyn TokenStore>,
    cipher: CardCipher,
    random: Arc<dyn RandomSource>,
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Creates a new tokenizer.
    pub fn new(
        store: Arc<dyn TokenStore>,
        cipher: CardCipher,
        random: Arc<dyn RandomSource>,
        config: TokenizerConfig,
    ) -> Self {
        Self {
            store,
            cipher,
            random,
            config,
        }
    }

    /// Tokenizes a card.
    ///
    /// Brand and last4 are computed up front because the rejected
    /// response carries them too. A rejection leaves no trace in the
    /// token store. Issuance is one path regardless of mode: derive the
    /// key, look it up, else create — with a uniqueness conflict on
    /// insert resolved by re-reading the winner, so concurrent duplicate
    /// submissions converge on a single row.
    #[tracing::instrument(skip(self, card))]
    pub async fn tokenize(&self, card: &CardData) -> Result<TokenizationOutcome, TokenizerError> {
        card.validate()?;

        let brand = card.brand();
        let last4 = card.last4();

        if self.random.draw() < self.config.rejection_probability {
            metrics::counter!("tokenizations_total", "outcome" => "rejected").increment(1);
            tracing::info!(%brand, "tokenization rejected");
            return Ok(TokenizationOutcome::Rejected { last4, brand });
        }

        let token = match &self.config.hmac_secret {
            Some(secret) => derive_token(secret, &card.pan, card.exp_month, card.exp_year),
            None => random_token(),
        };

        if let Some(existing) = self.store.find_by_token(&token).await? {
            metrics::counter!("tokenizations_total", "outcome" => "replayed").increment(1);
            return Ok(issued(existing));
        }

        // CVV is deliberately absent from the encrypted payload.
        let payload = format!("{}|{}/{}|{}", card.pan, card.exp_month, card.exp_year, card.name);
        let (encrypted_payload, nonce) = self.cipher.encrypt(payload.as_bytes())?;

        let row = CardToken {
            token: token.clone(),
            last4,
            brand,
            encrypted_payload,
            nonce_hex: hex::encode(nonce),
            status: TokenStatus::Issued,
            created_at: Utc::now(),
        };

        match self.store.insert(&row).await {
            Ok(()) => {
                metrics::counter!("tokenizations_total", "outcome" => "issued").increment(1);
                tracing::info!(%brand, "token issued");
                Ok(issued(row))
            }
            Err(StoreError::DuplicateToken) => {
                // A concurrent caller raced the same derived key to
                // completion first; serve its row.
                let winner = self
                    .store
                    .find_by_token(&token)
                    .await?
                    .ok_or(TokenizerError::ConflictVanished)?;
                metrics::counter!("tokenizations_total", "outcome" => "replayed").increment(1);
                Ok(issued(winner))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn issued(row: CardToken) -> TokenizationOutcome {
    TokenizationOutcome::Issued {
        token: row.token,
        last4: row.last4,
        brand: row.brand,
    }
}
