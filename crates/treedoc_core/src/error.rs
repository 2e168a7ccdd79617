//! Error types for collection operations.

use thiserror::Error;
use treedoc_driver::DriverError;

/// Result type for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Errors returned by collection operations.
///
/// Lookups that find nothing (deleting a missing key, creating a duplicate
/// name) are not errors; they surface as outcome variants instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    /// The driver reported a failure. The local cache was left untouched.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// A driver call did not complete within the configured timeout.
    #[error("driver call `{operation}` timed out")]
    Timeout {
        /// Driver operation that timed out.
        operation: &'static str,
    },
}

impl CollectionError {
    /// Returns the driver error, if this is one.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            CollectionError::Driver(err) => Some(err),
            CollectionError::Timeout { .. } => None,
        }
    }
}
