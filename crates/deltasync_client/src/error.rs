//! Error types for the sync client.

use crate::page::Page;
use crate::transport::{HttpResponse, TransportError};
use deltasync_protocol::ProtocolError;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Stable discriminant of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    /// See [`SyncError::Transport`].
    Transport,
    /// See [`SyncError::MissingContinuationToken`].
    MissingContinuationToken,
    /// See [`SyncError::ValidationFailed`].
    ValidationFailed,
    /// See [`SyncError::Unknown`].
    Unknown,
    /// See [`SyncError::InvalidToken`].
    InvalidToken,
    /// See [`SyncError::InvalidConfig`].
    InvalidConfig,
    /// See [`SyncError::Cancelled`].
    Cancelled,
    /// See [`SyncError::PageLimitExceeded`].
    PageLimitExceeded,
}

impl ErrorReason {
    /// Returns the camelCase name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::Transport => "transportFailure",
            ErrorReason::MissingContinuationToken => "missingContinuationToken",
            ErrorReason::ValidationFailed => "validationFailed",
            ErrorReason::Unknown => "unknown",
            ErrorReason::InvalidToken => "invalidToken",
            ErrorReason::InvalidConfig => "invalidConfig",
            ErrorReason::Cancelled => "cancelled",
            ErrorReason::PageLimitExceeded => "pageLimitExceeded",
        }
    }
}

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The HTTP exchange failed after the retry policy was exhausted.
    #[error("transport error for {url}: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A successful response lacked the `X-Continuation` header.
    #[error("response from {url} (status {status}) has no continuation token")]
    MissingContinuationToken {
        /// Requested URL.
        url: String,
        /// HTTP status of the response.
        status: u16,
        /// Token the failed request was sent with, if any.
        previous_token: Option<String>,
    },

    /// The response body does not match the expected shape.
    #[error("response from {url} failed validation: {source}")]
    ValidationFailed {
        /// Requested URL.
        url: String,
        /// Structural diagnostic.
        #[source]
        source: ProtocolError,
        /// The raw response.
        response: Box<HttpResponse>,
    },

    /// An unexpected error or panic raised by a custom HTTP service.
    #[error("unexpected error from http service: {message}")]
    Unknown {
        /// Description of the failure.
        message: String,
        /// The underlying error, when one was returned rather than panicked.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// An empty continuation token was supplied.
    #[error("continuation token must not be empty")]
    InvalidToken,

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was cancelled between cycles.
    #[error("sync cancelled")]
    Cancelled,

    /// The page cap was reached before the feed reported an empty page.
    #[error("page limit of {limit} reached before the feed was exhausted")]
    PageLimitExceeded {
        /// Configured cap.
        limit: u32,
    },
}

impl SyncError {
    /// Wraps a transport failure for the given URL.
    ///
    /// Errors raised by custom transports become [`SyncError::Unknown`].
    pub fn from_transport(url: impl Into<String>, error: TransportError) -> Self {
        match error {
            TransportError::Custom(source) => SyncError::Unknown {
                message: source.to_string(),
                source: Some(source),
            },
            source => SyncError::Transport {
                url: url.into(),
                source,
            },
        }
    }

    /// Returns the discriminant of this error.
    pub fn reason(&self) -> ErrorReason {
        match self {
            SyncError::Transport { .. } => ErrorReason::Transport,
            SyncError::MissingContinuationToken { .. } => ErrorReason::MissingContinuationToken,
            SyncError::ValidationFailed { .. } => ErrorReason::ValidationFailed,
            SyncError::Unknown { .. } => ErrorReason::Unknown,
            SyncError::InvalidToken => ErrorReason::InvalidToken,
            SyncError::InvalidConfig(_) => ErrorReason::InvalidConfig,
            SyncError::Cancelled => ErrorReason::Cancelled,
            SyncError::PageLimitExceeded { .. } => ErrorReason::PageLimitExceeded,
        }
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Transport { source, .. } => source.status(),
            SyncError::MissingContinuationToken { status, .. } => Some(*status),
            SyncError::ValidationFailed { response, .. } => Some(response.status),
            _ => None,
        }
    }
}

/// Failure of an aggregated run, carrying every page fetched before it.
#[derive(Error, Debug)]
#[error("sync stopped after {} page(s): {error}", .pages.len())]
pub struct PartialSyncError {
    /// The error that ended the run.
    #[source]
    pub error: SyncError,
    /// Pages fetched before the failure, in fetch order.
    pub pages: Vec<Page>,
}

impl PartialSyncError {
    /// Creates a partial failure.
    pub fn new(error: SyncError, pages: Vec<Page>) -> Self {
        Self { error, pages }
    }

    /// Returns the discriminant of the underlying error.
    pub fn reason(&self) -> ErrorReason {
        self.error.reason()
    }

    /// Returns the token to resume from: the token of the last page fetched.
    pub fn resume_token(&self) -> Option<&str> {
        self.pages.last().map(Page::continuation_token)
    }

    /// Splits into the error and the recovered pages.
    pub fn into_parts(self) -> (SyncError, Vec<Page>) {
        (self.error, self.pages)
    }
}
