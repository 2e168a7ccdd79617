//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value to CBOR.
    #[error("encoding failed: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error.
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }
}
