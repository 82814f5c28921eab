//! Payload encryption and token derivation.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::TokenizerError;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic tokens are truncated to this many base64url chars.
const DERIVED_TOKEN_LEN: usize = 24;

/// AES-256-GCM cipher for card payloads.
///
/// A fresh 12-byte nonce is generated per encryption; nonce reuse under
/// the same key would break the AEAD guarantees.
#[derive(Clone)]
pub struct CardCipher {
    cipher: Aes256Gcm,
}

impl CardCipher {
    /// Builds a cipher from a hex-encoded 32-byte key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, TokenizerError> {
        let bytes = hex::decode(key_hex)
            .map_err(|e| TokenizerError::InvalidKey(format!("not valid hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(TokenizerError::InvalidKey(format!(
                "AES-256 key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes)),
        })
    }

    /// Encrypts a payload, returning the ciphertext and the nonce used.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), TokenizerError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| TokenizerError::Encryption)?;
        Ok((ciphertext, nonce.to_vec()))
    }

    /// Decrypts a payload previously produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, TokenizerError> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenizerError::Encryption)
    }
}

/// Derives the deterministic token for a card: a truncated base64url
/// HMAC-SHA256 over `pan|expMonth|expYear`. Identical card data always
/// derives the same token, which is what makes issuance idempotent.
pub fn derive_token(secret: &str, pan: &str, exp_month: u8, exp_year: u16) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{pan}|{exp_month}|{exp_year}").as_bytes());
    let raw = mac.finalize().into_bytes();
    let mut encoded = URL_SAFE_NO_PAD.encode(raw);
    encoded.truncate(DERIVED_TOKEN_LEN);
    encoded
}

/// Generates a random token for non-idempotent mode.
pub fn random_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(
            CardCipher::from_hex_key("zz"),
            Err(TokenizerError::InvalidKey(_))
        ));
        assert!(matches!(
            CardCipher::from_hex_key("0011"),
            Err(TokenizerError::InvalidKey(_))
        ));
    }

    #[test]
    fn encrypt_roundtrip_with_fresh_nonces() {
        let cipher = CardCipher::from_hex_key(KEY_HEX).unwrap();
        let payload = b"4111111111111111|10/2030|JANE DOE";

        let (ct1, nonce1) = cipher.encrypt(payload).unwrap();
        let (ct2, nonce2) = cipher.encrypt(payload).unwrap();
        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);

        assert_eq!(cipher.decrypt(&ct1, &nonce1).unwrap(), payload);
        assert_eq!(cipher.decrypt(&ct2, &nonce2).unwrap(), payload);
    }

    #[test]
    fn derive_token_is_deterministic_and_truncated() {
        let a = derive_token("secret", "4111111111111111", 10, 2030);
        let b = derive_token("secret", "4111111111111111", 10, 2030);
        assert_eq!(a, b);
        assert_eq!(a.len(), DERIVED_TOKEN_LEN);

        let other_card = derive_token("secret", "4111111111111111", 11, 2030);
        assert_ne!(a, other_card);
        let other_secret = derive_token("secret2", "4111111111111111", 10, 2030);
        assert_ne!(a, other_secret);
    }

    #[test]
    fn random_tokens_are_unique() {
        assert_ne!(random_token(), random_token());
    }
}
