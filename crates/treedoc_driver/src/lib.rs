//! # treedoc Driver
//!
//! Persistence driver contract for treedoc.
//!
//! This crate provides:
//! - The [`Driver`] trait every backend implements
//! - Collection and document records exchanged with a driver
//! - The [`QueryModel`] passed through to a driver's query engine
//! - [`InMemoryDriver`], a reference backend for tests
//!
//! ## Key Invariants
//!
//! - Drivers are the durable source of truth
//! - Every driver call returns a result or an error value; nothing panics
//! - Drivers never share memory with the collection tree

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod id;
mod memory;
mod query;
mod record;

pub use driver::Driver;
pub use error::{DriverError, DriverResult, RecordKind};
pub use id::{CollectionId, DocumentId};
pub use memory::InMemoryDriver;
pub use query::{Filter, FilterOp, QueryModel, SortKey, SortOrder};
pub use record::{CollectionRecord, Document};
