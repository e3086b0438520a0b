use thiserror::Error;

#[derive(Error, Debug)]
pub enum FmError {
    /// The underlying network call itself failed (DNS, refused connection,
    /// timeout). Surfaced unchanged.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx HTTP status with a body that could not be read as a Data API
    /// envelope.
    #[error("HTTP error {code}: {message}")]
    Http { code: u16, message: String },

    /// The envelope parsed but carried a non-zero FileMaker error code.
    /// This is the normal channel for "record not found", "no records match",
    /// "invalid token", and friends.
    #[error("FileMaker operation failed (code {code}): {message}")]
    Operation { code: String, message: String },

    /// A 2xx response whose body was not a valid envelope. There is no
    /// status code to fall back on, so this is unrecoverable.
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    /// The endpoint could not be joined into a valid request URL.
    #[error("Invalid request URL: {0}")]
    Url(String),

    /// A request body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Body(#[from] serde_json::Error),

    /// Serializing or encrypting a token failed.
    #[error("Token encryption failed")]
    TokenEncrypt,

    /// An encrypted token was rejected: bad authentication tag, malformed
    /// segments, or garbage plaintext. Wrong secret and tampering both land
    /// here.
    #[error("Token decryption failed: ciphertext rejected")]
    TokenDecrypt,

    /// The encrypted-token export was requested on a client constructed
    /// without persistent mode.
    #[error("Token export requires persistent mode")]
    PersistentModeRequired,
}

impl FmError {
    /// Build an HTTP-status error from a response status line.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        FmError::Http {
            code: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string(),
        }
    }

    /// The operation or HTTP code carried by this error, if any.
    pub fn code(&self) -> Option<String> {
        match self {
            FmError::Http { code, .. } => Some(code.to_string()),
            FmError::Operation { code, .. } => Some(code.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_code_and_reason() {
        let err = FmError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            FmError::Http { code, ref message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal Server Error");
            }
            _ => panic!("expected Http variant"),
        }
        assert_eq!(err.code().as_deref(), Some("500"));
    }

    #[test]
    fn test_operation_code_accessor() {
        let err = FmError::Operation {
            code: "401".to_string(),
            message: "No records match the request".to_string(),
        };
        assert_eq!(err.code().as_deref(), Some("401"));
        assert!(err.to_string().contains("401"));
    }
}
