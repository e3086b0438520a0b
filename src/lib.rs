//! fmdata - a client library for the FileMaker Data API.
//!
//! The Data API is a stateful, token-authenticated REST API: a session
//! is opened with basic credentials, yields an opaque bearer token with
//! a 15-minute sliding expiration, and every record operation rides on
//! that token until logout or expiry. This crate wraps the whole
//! lifecycle:
//!
//! - [`FmClient`]: record operations (create, edit, duplicate, delete,
//!   get, range, find, run-script) against named layouts
//! - [`auth::Session`]: lazy authentication, token renewal, and uniform
//!   response-envelope interpretation for every outbound call
//! - persistent mode: export the session token in encrypted form and
//!   seed a later process with it, skipping re-authentication
//!
//! ```no_run
//! use fmdata::{ClientConfig, FindParams, FindQuery, FmClient};
//!
//! # async fn run() -> Result<(), fmdata::FmError> {
//! let config = ClientConfig::new("user", "pass", "fm.example.com", "Inventory");
//! let client = FmClient::new(&config)?;
//!
//! let found = client
//!     .find(
//!         "ProductDetails",
//!         &FindParams {
//!             query: vec![FindQuery::new().field("Quantity", "<10")],
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! println!("{} records low on stock", found.data_info.found_count);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{
    EditRecordOptions, FindParams, FmClient, FmError, GetRecordParams, GetRecordRangeParams,
};
pub use auth::{Session, Token};
pub use config::{ApiVersion, ClientConfig, PersistentMode};
pub use models::{
    ApiResponse, CreateRecordResponse, DataInfo, DuplicateRecordResponse, EditRecordResponse,
    FieldData, FindQuery, FmRecord, OperationStatus, PortalRange, RecordsResponse,
    RunScriptResponse, ScriptCall, ScriptExecution, SortDirection, SortOrder,
};
