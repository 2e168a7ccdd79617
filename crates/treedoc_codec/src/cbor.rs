//! CBOR encoding of document values.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Encode a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the underlying writer rejects the value.
pub fn to_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding(e.to_string()))?;
    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not well-formed CBOR or contain an
/// item that has no `Value` counterpart (e.g. a non-text map key).
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding(e.to_string()))
}
