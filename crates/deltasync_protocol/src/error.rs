//! Error types for the protocol crate.

use crate::payload::Collection;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while interpreting delta sync wire data.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The response body does not have the expected structure.
    #[error("payload does not match the expected shape: {0}")]
    InvalidPayload(String),

    /// An init response carried delta records.
    #[error("init payload must be empty, but '{collection}' holds {count} record(s)")]
    NonEmptyInit {
        /// Offending collection.
        collection: Collection,
        /// Number of records found.
        count: usize,
    },

    /// The base URL could not be used to build endpoints.
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown API mode name.
    #[error("unknown api mode '{0}', expected one of: public, preview, secure")]
    UnknownApiMode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::InvalidPayload(e.to_string())
    }
}
