//! Records exchanged with a driver.

use crate::id::{CollectionId, DocumentId};
use serde::{Deserialize, Serialize};
use treedoc_codec::Value;

/// A collection as stored by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    /// Collection id.
    pub id: CollectionId,
    /// Name, unique among siblings.
    pub name: String,
    /// Owning collection, or `None` for a root collection.
    pub parent_id: Option<CollectionId>,
}

impl CollectionRecord {
    /// Creates a collection record.
    pub fn new(id: CollectionId, name: impl Into<String>, parent_id: Option<CollectionId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
        }
    }
}

/// A document: a keyed value owned by one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, assigned at creation.
    pub id: DocumentId,
    /// Owning collection.
    pub parent_id: CollectionId,
    /// Caller-chosen key, unique among the collection's documents.
    pub key: String,
    /// Opaque payload.
    pub value: Value,
}

impl Document {
    /// Creates a document record.
    pub fn new(id: DocumentId, parent_id: CollectionId, key: impl Into<String>, value: Value) -> Self {
        Self {
            id,
            parent_id,
            key: key.into(),
            value,
        }
    }
}
