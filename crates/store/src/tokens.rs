//! Card token persistence port.

use async_trait::async_trait;
use domain::CardToken;

use crate::error::Result;

/// Storage port for issued card tokens, owned exclusively by the
/// tokenizer.
///
/// The token value is the unique key. Implementations must reject a
/// second insert of the same value with [`StoreError::DuplicateToken`]
/// (atomically with respect to concurrent inserts) so the tokenizer can
/// resolve races by re-reading.
///
/// [`StoreError::DuplicateToken`]: crate::StoreError::DuplicateToken
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts a new token row keyed by its token value.
    async fn insert(&self, token: &CardToken) -> Result<()>;

    /// Looks up a token row by its token value.
    async fn find_by_token(&self, token: &str) -> Result<Option<CardToken>>;
}
