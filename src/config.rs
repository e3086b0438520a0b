//! Client configuration.
//!
//! A [`ClientConfig`] carries everything needed to open a Data API
//! session: host, database, credentials, API version, and the optional
//! persistent and profiling modes.

use serde::{Deserialize, Serialize};

/// The Data API version segment of the request path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
    /// Whatever version the server considers current.
    #[default]
    #[serde(rename = "vLatest")]
    VLatest,
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
            ApiVersion::VLatest => "vLatest",
        };
        f.write_str(s)
    }
}

/// Persistent-mode settings: an encryption key for the exported token
/// and, optionally, a blob captured by an earlier process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentMode {
    /// Caller-supplied secret the token codec derives its key from.
    pub token_encryption_key: String,
    /// Encrypted token from a previous session, if resuming one.
    #[serde(default)]
    pub existing_encrypted_token: Option<String>,
}

impl PersistentMode {
    pub fn new(token_encryption_key: impl Into<String>) -> Self {
        Self {
            token_encryption_key: token_encryption_key.into(),
            existing_encrypted_token: None,
        }
    }

    /// Seed the session with a previously exported encrypted token.
    pub fn with_existing_token(mut self, encrypted: impl Into<String>) -> Self {
        self.existing_encrypted_token = Some(encrypted.into());
        self
    }
}

/// Connection settings for a FileMaker Data API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub username: String,
    pub password: String,
    /// Server host. A bare hostname gets `https://` prepended; an explicit
    /// scheme is left untouched.
    pub host: String,
    pub database: String,
    #[serde(default)]
    pub api_version: ApiVersion,
    /// Enables encrypted token export/import across processes.
    #[serde(default)]
    pub persistent: Option<PersistentMode>,
    /// Emit per-request timing via `tracing` at debug level.
    #[serde(default)]
    pub profiling: bool,
}

impl ClientConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            database: database.into(),
            api_version: ApiVersion::default(),
            persistent: None,
            profiling: false,
        }
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn persistent(mut self, mode: PersistentMode) -> Self {
        self.persistent = Some(mode);
        self
    }

    pub fn profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    /// Build a configuration from the environment.
    ///
    /// Reads `FMDATA_USERNAME`, `FMDATA_PASSWORD`, `FMDATA_HOST` and
    /// `FMDATA_DATABASE`, loading a `.env` file first if one is present.
    /// Returns `None` when any of the four is missing.
    pub fn from_env() -> Option<Self> {
        let _ = dotenvy::dotenv();
        Some(Self::new(
            std::env::var("FMDATA_USERNAME").ok()?,
            std::env::var("FMDATA_PASSWORD").ok()?,
            std::env::var("FMDATA_HOST").ok()?,
            std::env::var("FMDATA_DATABASE").ok()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_display() {
        assert_eq!(ApiVersion::V1.to_string(), "v1");
        assert_eq!(ApiVersion::V2.to_string(), "v2");
        assert_eq!(ApiVersion::VLatest.to_string(), "vLatest");
        assert_eq!(ApiVersion::default(), ApiVersion::VLatest);
    }

    #[test]
    fn test_builder_defaults() {
        let config = ClientConfig::new("user", "pass", "example.com", "Inventory");
        assert_eq!(config.api_version, ApiVersion::VLatest);
        assert!(config.persistent.is_none());
        assert!(!config.profiling);
    }
}
