//! # treedoc Codec
//!
//! Document payload type and CBOR encoding for treedoc.
//!
//! Document values are opaque to the collection tree: they are carried
//! through to the driver and echoed in change events without being
//! inspected. This crate gives them a concrete, typed shape ([`Value`]) and
//! a compact wire form (CBOR) that drivers may use for storage.
//!
//! ## Usage
//!
//! ```
//! use treedoc_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::map([("title", Value::from("hello")), ("done", Value::Bool(false))]);
//! let bytes = to_cbor(&value).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use value::Value;
