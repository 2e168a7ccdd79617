//! # treedoc Core
//!
//! Client-side collection tree for a hierarchical document store.
//!
//! This crate provides:
//! - [`Collection`]: a node caching its direct sub-collections and documents
//! - The synchronization protocol between a node and its [`Driver`]
//! - The change-event taxonomy ([`ChangeEvent`]) and [`Notifier`] channel
//! - [`ChangeFeed`], a fan-out notifier with catch-up history
//!
//! ## Architecture
//!
//! A caller invokes an operation on a node, the node calls the driver, and
//! only on success updates its cache and emits one change event:
//!
//! ```text
//! caller ──▶ Collection ──▶ Driver
//!                │  (ok)
//!                ├──▶ cache update
//!                └──▶ Notifier ──▶ subscribers
//! ```
//!
//! ## Key Invariants
//!
//! - Sibling names are unique; creating a duplicate is a no-op
//! - Document keys are unique within a collection
//! - A failed driver call never changes the cache and never emits an event
//! - `fetch` replaces the direct-child caches wholesale; it never merges
//! - Mutations borrow the node mutably, so they cannot interleave
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use treedoc_core::{ChangeFeed, Collection, InMemoryDriver, Value};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let driver = Arc::new(InMemoryDriver::new());
//! let feed = Arc::new(ChangeFeed::new());
//!
//! let mut root = Collection::root(driver, feed.clone(), "app");
//! root.fetch(false).await;
//! root.create_subcollection("todos").await.unwrap();
//!
//! let todos = root.subcollection_mut("todos").unwrap();
//! todos.create_document(Value::from("buy milk"), Some("t1")).await.unwrap();
//!
//! assert_eq!(todos.path(), "/app/todos");
//! assert_eq!(feed.history_len(), 2);
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod error;
mod event;
mod notify;
mod outcome;

pub use collection::Collection;
pub use config::{CollectionConfig, UpdateTarget};
pub use error::{CollectionError, CollectionResult};
pub use event::{ChangeEvent, ChangePayload, ChangeSubject, ChangeType};
pub use notify::{ChangeFeed, ChangeRecord, Notifier};
pub use outcome::{CreateOutcome, DeleteOutcome, FetchReport, TreeFetchReport, UpsertOutcome};

pub use treedoc_codec::Value;
pub use treedoc_driver::{
    CollectionId, CollectionRecord, Document, DocumentId, Driver, DriverError, DriverResult,
    Filter, FilterOp, InMemoryDriver, QueryModel, SortKey, SortOrder,
};
