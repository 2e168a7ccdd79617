//! Change events emitted by collection nodes.
//!
//! Every successful mutation, and every query, produces exactly one
//! [`ChangeEvent`]. An event is a (subject, type, payload) triple whose
//! payload carries enough data for an observer to apply the change without
//! going back to the driver.

use std::fmt;
use treedoc_codec::Value;
use treedoc_driver::{CollectionId, Document};

/// What an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSubject {
    /// A sub-collection changed.
    Collection,
    /// A document changed, or a query over documents completed.
    Document,
}

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Something was created.
    Added,
    /// An existing document's value was replaced.
    Updated,
    /// Something was removed.
    Deleted,
    /// A query produced a result set.
    Query,
}

impl fmt::Display for ChangeSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSubject::Collection => f.write_str("collection"),
            ChangeSubject::Document => f.write_str("document"),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Added => f.write_str("added"),
            ChangeType::Updated => f.write_str("updated"),
            ChangeType::Deleted => f.write_str("deleted"),
            ChangeType::Query => f.write_str("query"),
        }
    }
}

/// Subject-specific event data.
///
/// `path` is the emitting collection's path, except for query results where
/// it is copied from the query model.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePayload {
    /// A sub-collection was added to or removed from the collection at `path`.
    Collection {
        /// Id of the affected sub-collection.
        collection_id: CollectionId,
        /// Path of the parent collection.
        path: String,
    },
    /// A document was added, updated or deleted.
    Document {
        /// Id of the owning collection.
        collection_id: CollectionId,
        /// Document key.
        key: String,
        /// New value; `None` for deletions.
        value: Option<Value>,
        /// Path of the owning collection.
        path: String,
    },
    /// A query completed.
    Query {
        /// Id of the queried collection.
        collection_id: CollectionId,
        /// Path taken from the query model.
        path: String,
        /// Result set, empty when the driver returned nothing.
        docs: Vec<Document>,
    },
}

impl ChangePayload {
    /// Returns the path this payload is addressed to.
    pub fn path(&self) -> &str {
        match self {
            ChangePayload::Collection { path, .. }
            | ChangePayload::Document { path, .. }
            | ChangePayload::Query { path, .. } => path,
        }
    }

    /// Returns the collection id carried by this payload.
    pub fn collection_id(&self) -> &CollectionId {
        match self {
            ChangePayload::Collection { collection_id, .. }
            | ChangePayload::Document { collection_id, .. }
            | ChangePayload::Query { collection_id, .. } => collection_id,
        }
    }
}

/// A single observed mutation or query result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// What the event is about.
    pub subject: ChangeSubject,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Event data.
    pub payload: ChangePayload,
}

impl ChangeEvent {
    /// A sub-collection was created under the collection at `path`.
    pub fn collection_added(collection_id: CollectionId, path: impl Into<String>) -> Self {
        Self {
            subject: ChangeSubject::Collection,
            change_type: ChangeType::Added,
            payload: ChangePayload::Collection {
                collection_id,
                path: path.into(),
            },
        }
    }

    /// A sub-collection was deleted from the collection at `path`.
    pub fn collection_deleted(collection_id: CollectionId, path: impl Into<String>) -> Self {
        Self {
            subject: ChangeSubject::Collection,
            change_type: ChangeType::Deleted,
            payload: ChangePayload::Collection {
                collection_id,
                path: path.into(),
            },
        }
    }

    /// A document was created.
    pub fn document_added(
        collection_id: CollectionId,
        key: impl Into<String>,
        value: Value,
        path: impl Into<String>,
    ) -> Self {
        Self::document(ChangeType::Added, collection_id, key, Some(value), path)
    }

    /// A document's value was replaced.
    pub fn document_updated(
        collection_id: CollectionId,
        key: impl Into<String>,
        value: Value,
        path: impl Into<String>,
    ) -> Self {
        Self::document(ChangeType::Updated, collection_id, key, Some(value), path)
    }

    /// A document was deleted.
    pub fn document_deleted(
        collection_id: CollectionId,
        key: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::document(ChangeType::Deleted, collection_id, key, None, path)
    }

    /// A query over a collection's documents completed.
    pub fn query(collection_id: CollectionId, path: impl Into<String>, docs: Vec<Document>) -> Self {
        Self {
            subject: ChangeSubject::Document,
            change_type: ChangeType::Query,
            payload: ChangePayload::Query {
                collection_id,
                path: path.into(),
                docs,
            },
        }
    }

    fn document(
        change_type: ChangeType,
        collection_id: CollectionId,
        key: impl Into<String>,
        value: Option<Value>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            subject: ChangeSubject::Document,
            change_type,
            payload: ChangePayload::Document {
                collection_id,
                key: key.into(),
                value,
                path: path.into(),
            },
        }
    }

    /// Returns the path this event is addressed to.
    pub fn path(&self) -> &str {
        self.payload.path()
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.subject, self.change_type, self.path())
    }
}
