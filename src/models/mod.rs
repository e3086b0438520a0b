//! Wire-format types for the FileMaker Data API.
//!
//! This module contains the data structures exchanged with the server:
//!
//! - `ApiResponse`, `OperationStatus`: the response envelope every call
//!   is wrapped in
//! - `FmRecord`, `RecordsResponse`, `DataInfo`: records and found sets
//! - `FindQuery`, `SortOrder`, `PortalRange`, `ScriptExecution`: the
//!   request-side shapes for finds, sorting, portals, and script calls
//! - Per-operation response payloads (`CreateRecordResponse`, ...)

pub mod record;
pub mod request;
pub mod response;

pub use record::{DataInfo, FieldData, FmRecord, RecordsResponse};
pub use request::{FindQuery, PortalRange, ScriptCall, ScriptExecution, SortDirection, SortOrder};
pub use response::{
    ApiResponse, CreateRecordResponse, DuplicateRecordResponse, EditRecordResponse,
    OperationStatus, RunScriptResponse, SessionResponse,
};
