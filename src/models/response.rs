//! Response envelope and per-operation response bodies.

use serde::Deserialize;

use crate::api::FmError;

/// One status record from the response envelope. `"0"` is success; any
/// other code is the FileMaker error number for the failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationStatus {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// The generic envelope every Data API response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// The status of the operation, in server order.
    pub messages: Vec<OperationStatus>,
    /// The business payload; shape depends on the operation.
    pub response: T,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, raising the first non-zero status code.
    ///
    /// Every message is checked, not just the first: a response is only
    /// successful when the server reported no error anywhere.
    pub fn into_result(self) -> Result<T, FmError> {
        for status in &self.messages {
            if status.code != "0" {
                return Err(FmError::Operation {
                    code: status.code.clone(),
                    message: status.message.clone(),
                });
            }
        }
        Ok(self.response)
    }
}

/// Payload of a successful `POST /sessions` call.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    /// The bearer credential for subsequent calls.
    pub token: String,
}

/// Payload returned when creating a record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordResponse {
    /// The record ID of the newly created record.
    pub record_id: String,
    /// The modification ID of the newly created record (initially "0").
    pub mod_id: String,
}

/// Payload returned when editing a record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecordResponse {
    /// The new modification ID of the edited record.
    pub mod_id: String,
}

/// Payload returned when duplicating a record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecordResponse {
    pub record_id: String,
    pub mod_id: String,
}

/// Payload returned when running a script directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptResponse {
    /// The script's own error code ("0" is no error).
    pub script_error: String,
    /// The script result, if the script produced one.
    #[serde(default)]
    pub script_result: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
