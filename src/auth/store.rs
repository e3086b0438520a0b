//! Pluggable storage for the session token.
//!
//! The session keeps its current token behind a [`TokenStore`] so the
//! sharing and persistence scope is an explicit choice:
//!
//! - `MemoryTokenStore`: plain in-process slot, dropped with the client
//! - `EncryptedTokenStore`: additionally mirrors the token as an encrypted
//!   blob that can be exported, stored externally (cookie, database row,
//!   file), and fed back to a later process to skip re-authentication

use crate::api::FmError;

use super::token::Token;

/// Storage backend for the session's current token.
pub trait TokenStore: Send {
    /// The current token, if one is available and still live.
    ///
    /// A store backed by external state may do real work here (decrypting,
    /// expiry checking) and must fail closed on unverifiable input.
    fn load(&mut self) -> Result<Option<Token>, FmError>;

    /// Replace the current token.
    fn save(&mut self, token: Token) -> Result<(), FmError>;

    /// Drop all cached token state.
    fn invalidate(&mut self);

    /// The encrypted serialization of the current token, for stores that
    /// keep one.
    fn export(&self) -> Option<&str> {
        None
    }

    /// Whether this store can export an encrypted token.
    fn supports_export(&self) -> bool {
        false
    }
}

/// In-process token slot with no persistence.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Option<Token>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&mut self) -> Result<Option<Token>, FmError> {
        Ok(self.token.clone())
    }

    fn save(&mut self, token: Token) -> Result<(), FmError> {
        self.token = Some(token);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.token = None;
    }
}

/// Token slot that mirrors every saved token as an encrypted blob.
///
/// Seeding the store with a previously exported blob lets a new process
/// resume an authenticated session, provided the token has not expired
/// and the same encryption key is supplied.
pub struct EncryptedTokenStore {
    encryption_key: String,
    token: Option<Token>,
    encrypted: Option<String>,
}

impl EncryptedTokenStore {
    pub fn new(encryption_key: impl Into<String>, existing_encrypted: Option<String>) -> Self {
        Self {
            encryption_key: encryption_key.into(),
            token: None,
            encrypted: existing_encrypted,
        }
    }
}

impl TokenStore for EncryptedTokenStore {
    fn load(&mut self) -> Result<Option<Token>, FmError> {
        if self.token.is_some() {
            return Ok(self.token.clone());
        }

        // No decrypted token yet; try the seeded blob. A blob holding an
        // expired token is discarded so the session falls back to fresh
        // authentication.
        let Some(encrypted) = self.encrypted.as_deref() else {
            return Ok(None);
        };
        let token = Token::decrypt(&self.encryption_key, encrypted)?;
        if token.expired() {
            self.invalidate();
            return Ok(None);
        }
        self.token = Some(token.clone());
        Ok(Some(token))
    }

    fn save(&mut self, token: Token) -> Result<(), FmError> {
        self.encrypted = Some(token.encrypt(&self.encryption_key)?);
        self.token = Some(token);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.token = None;
        self.encrypted = None;
    }

    fn export(&self) -> Option<&str> {
        self.encrypted.as_deref()
    }

    fn supports_export(&self) -> bool {
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
