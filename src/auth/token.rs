//! Session token management for the FileMaker Data API.
//!
//! FileMaker session tokens use a sliding expiration: the server keeps a
//! token alive for 15 minutes after its last use. `Token` mirrors that
//! window locally so the client can skip redundant authentication calls,
//! and knows how to serialize itself through an authenticated encryption
//! codec for storage outside the process.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::FmError;

/// Token expiry time in minutes.
/// FileMaker Server invalidates Data API tokens after 15 minutes of
/// inactivity; each use pushes the window forward.
const TOKEN_TTL_MINUTES: i64 = 15;

/// ChaCha20-Poly1305 nonce size in bytes (24 hex characters).
const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size in bytes (32 hex characters).
const TAG_SIZE: usize = 16;

/// A bearer credential for the Data API with its sliding expiration.
///
/// The expiration is tracked as epoch milliseconds so comparisons are
/// always against the same clock, with no timezone ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    value: String,
    expiration: i64,
}

impl Token {
    /// Wrap a freshly issued credential. The expiration starts one full
    /// TTL from now.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expiration: renewed_expiration(),
        }
    }

    /// Reconstruct a token with a known expiration, e.g. one decrypted
    /// from external storage.
    pub fn with_expiration(value: impl Into<String>, expiration: i64) -> Self {
        Self {
            value: value.into(),
            expiration,
        }
    }

    /// Use the token: returns the credential and resets the sliding
    /// expiry to one TTL from now. Every authenticated request goes
    /// through this exactly once, so idle sessions expire while active
    /// ones do not.
    pub fn use_token(&mut self) -> &str {
        self.expiration = renewed_expiration();
        &self.value
    }

    /// Whether the expiration has passed.
    pub fn expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expiration
    }

    /// The expiration timestamp in epoch milliseconds.
    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    /// Serialize and encrypt this token for storage outside the process.
    ///
    /// The secret is hashed to a fixed-length key. The output is
    /// `hex(nonce) || hex(ciphertext) || hex(tag)`: nonce and tag are
    /// fixed-width, so all three segments are recoverable by position.
    pub fn encrypt(&self, secret: &str) -> Result<String, FmError> {
        let cipher = ChaCha20Poly1305::new(&derive_key(secret));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = serde_json::to_vec(self).map_err(|_| FmError::TokenEncrypt)?;
        let mut ciphertext = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|_| FmError::TokenEncrypt)?;

        // The AEAD appends the tag; peel it off so it can be emitted as
        // its own fixed-width segment.
        let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

        Ok(format!(
            "{}{}{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext),
            hex::encode(tag)
        ))
    }

    /// Decrypt a token previously produced by [`Token::encrypt`].
    ///
    /// Fails closed: a wrong secret, a tampered blob, or any malformed
    /// segment yields [`FmError::TokenDecrypt`], never a token built from
    /// unverified ciphertext.
    pub fn decrypt(secret: &str, encrypted: &str) -> Result<Token, FmError> {
        // Positional layout: nonce up front, tag at the back, ciphertext
        // in between.
        if !encrypted.is_ascii() || encrypted.len() < (NONCE_SIZE + TAG_SIZE) * 2 {
            return Err(FmError::TokenDecrypt);
        }
        let nonce_hex = &encrypted[..NONCE_SIZE * 2];
        let tag_hex = &encrypted[encrypted.len() - TAG_SIZE * 2..];
        let ciphertext_hex = &encrypted[NONCE_SIZE * 2..encrypted.len() - TAG_SIZE * 2];

        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| FmError::TokenDecrypt)?;
        let tag = hex::decode(tag_hex).map_err(|_| FmError::TokenDecrypt)?;
        let mut ciphertext = hex::decode(ciphertext_hex).map_err(|_| FmError::TokenDecrypt)?;
        ciphertext.extend_from_slice(&tag);

        let cipher = ChaCha20Poly1305::new(&derive_key(secret));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| FmError::TokenDecrypt)?;

        serde_json::from_slice(&plaintext).map_err(|_| FmError::TokenDecrypt)
    }
}

/// Hash the caller-supplied secret down to a 32-byte cipher key.
fn derive_key(secret: &str) -> Key {
    let digest: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
    Key::from(digest)
}

fn renewed_expiration() -> i64 {
    Utc::now().timestamp_millis() + TOKEN_TTL_MINUTES * 60 * 1000
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_is_not_expired() {
        let token = Token::new("abc123");
        assert!(!token.expired());
    }

    #[test]
    fn test_with_past_expiration_is_expired() {
        let token = Token::with_expiration("abc123", Utc::now().timestamp_millis() - 1);
        assert!(token.expired());
    }

    #[test]
    fn test_use_token_returns_value_and_renews() {
        let mut token = Token::with_expiration("abc123", Utc::now().timestamp_millis() - 1);
        assert!(token.expired());

        let before = Utc::now().timestamp_millis();
        assert_eq!(token.use_token(), "abc123");
        assert!(!token.expired());
        assert!(token.expiration() >= before + TOKEN_TTL_MINUTES * 60 * 1000);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip_preserves_value_and_expiry() {
        let token = Token::with_expiration("fm-session-token", 1_700_000_000_000);
        let blob = token.encrypt("a shared secret").unwrap();
        let restored = Token::decrypt("a shared secret", &blob).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn test_encrypted_blob_is_hex_with_fixed_width_segments() {
        let token = Token::new("abc123");
        let blob = token.encrypt("secret").unwrap();
        assert!(blob.chars().all(|c| c.is_ascii_hexdigit()));
        // nonce + tag alone account for 56 hex characters.
        assert!(blob.len() > (NONCE_SIZE + TAG_SIZE) * 2);
    }

    #[test]
    fn test_decrypt_with_wrong_secret_fails() {
        let token = Token::new("abc123");
        let blob = token.encrypt("right secret").unwrap();
        assert!(matches!(
            Token::decrypt("wrong secret", &blob),
            Err(FmError::TokenDecrypt)
        ));
    }

    #[test]
    fn test_decrypt_tampered_blob_fails() {
        let token = Token::new("abc123");
        let mut blob = token.encrypt("secret").unwrap();
        // Flip one ciphertext nibble; the tag must reject it.
        let idx = NONCE_SIZE * 2;
        let original = blob.as_bytes()[idx];
        let flipped = if original == b'0' { '1' } else { '0' };
        blob.replace_range(idx..idx + 1, &flipped.to_string());
        assert!(matches!(
            Token::decrypt("secret", &blob),
            Err(FmError::TokenDecrypt)
        ));
    }

    #[test]
    fn test_decrypt_truncated_blob_fails() {
        assert!(matches!(
            Token::decrypt("secret", "deadbeef"),
            Err(FmError::TokenDecrypt)
        ));
        assert!(matches!(Token::decrypt("secret", ""), Err(FmError::TokenDecrypt)));
    }

    #[test]
    fn test_decrypt_non_hex_blob_fails() {
        let blob = "zz".repeat(NONCE_SIZE + TAG_SIZE + 8);
        assert!(matches!(
            Token::decrypt("secret", &blob),
            Err(FmError::TokenDecrypt)
        ));
    }
}
