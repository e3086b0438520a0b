//! Authentication module for managing Data API sessions and tokens.
//!
//! This module provides:
//! - `Session`: token-based session management with automatic renewal
//! - `Token`: the sliding-expiry bearer credential and its encryption codec
//! - `TokenStore`: pluggable token storage (in-memory or encrypted-external)
//!
//! Tokens expire after 15 minutes of inactivity; sessions authenticate
//! lazily and re-authenticate only when the cached token has expired.

pub mod session;
pub mod store;
pub mod token;

pub use session::Session;
pub use store::{EncryptedTokenStore, MemoryTokenStore, TokenStore};
pub use token::Token;
