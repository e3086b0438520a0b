//! REST API client module for the FileMaker Data API.
//!
//! This module provides the `FmClient` for issuing record operations
//! against a database's layouts, and the `FmError` taxonomy every
//! operation reports through.
//!
//! Authentication uses opaque bearer tokens obtained from the sessions
//! endpoint and renewed transparently by the session layer.

pub mod client;
pub mod error;

pub use client::{
    EditRecordOptions, FindParams, FmClient, GetRecordParams, GetRecordRangeParams,
};
pub use error::FmError;
