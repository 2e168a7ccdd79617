//! Error types for driver operations.

use std::fmt;
use thiserror::Error;
use treedoc_codec::CodecError;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// The kind of record a driver error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A collection record.
    Collection,
    /// A document record.
    Document,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Collection => f.write_str("collection"),
            RecordKind::Document => f.write_str("document"),
        }
    }
}

/// Errors reported by a data driver.
///
/// Every driver failure is a recoverable condition: callers receive it as a
/// value and decide how to report it. Nothing here is retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record looked up.
        kind: RecordKind,
        /// Id that was looked up.
        id: String,
    },

    /// A record with the same id already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Kind of record being created.
        kind: RecordKind,
        /// Conflicting id.
        id: String,
    },

    /// The backend reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The backend cannot be reached.
    #[error("driver unavailable")]
    Unavailable,
}

impl DriverError {
    /// Creates a not-found error.
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates an already-exists error.
    pub fn already_exists(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns true if this error means the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NotFound { .. })
    }
}
