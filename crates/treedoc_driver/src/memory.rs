//! In-memory driver for testing.

use crate::driver::Driver;
use crate::error::{DriverError, DriverResult, RecordKind};
use crate::id::{CollectionId, DocumentId};
use crate::query::QueryModel;
use crate::record::{CollectionRecord, Document};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use treedoc_codec::{from_cbor, to_cbor, Value};

#[derive(Debug)]
struct StoredCollection {
    record: CollectionRecord,
    seq: u64,
}

#[derive(Debug)]
struct StoredDocument {
    parent_id: CollectionId,
    key: String,
    /// CBOR-encoded value.
    payload: Vec<u8>,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<CollectionId, StoredCollection>,
    documents: HashMap<DocumentId, StoredDocument>,
    next_seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn children_of(&self, id: &CollectionId) -> Vec<CollectionRecord> {
        let mut children: Vec<&StoredCollection> = self
            .collections
            .values()
            .filter(|c| c.record.parent_id.as_ref() == Some(id))
            .collect();
        children.sort_by_key(|c| c.seq);
        children.into_iter().map(|c| c.record.clone()).collect()
    }

    fn documents_of(&self, id: &CollectionId) -> DriverResult<Vec<Document>> {
        let mut docs: Vec<(&DocumentId, &StoredDocument)> = self
            .documents
            .iter()
            .filter(|(_, d)| &d.parent_id == id)
            .collect();
        docs.sort_by_key(|(_, d)| d.seq);
        docs.into_iter()
            .map(|(doc_id, d)| -> DriverResult<Document> {
                Ok(Document::new(
                    doc_id.clone(),
                    d.parent_id.clone(),
                    d.key.clone(),
                    from_cbor(&d.payload)?,
                ))
            })
            .collect()
    }

    /// Removes `id`, its documents and every descendant collection.
    fn remove_subtree(&mut self, id: &CollectionId) {
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            self.collections.remove(&current);
            self.documents.retain(|_, d| d.parent_id != current);
            pending.extend(
                self.collections
                    .values()
                    .filter(|c| c.record.parent_id.as_ref() == Some(&current))
                    .map(|c| c.record.id.clone()),
            );
        }
    }
}

/// An in-memory driver.
///
/// This driver keeps every record in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral trees that don't need persistence
///
/// Document values are stored CBOR-encoded, so a value handed to the driver
/// is never aliased by the caller's copy.
///
/// # Example
///
/// ```rust
/// use treedoc_driver::{CollectionId, CollectionRecord, Driver, InMemoryDriver};
///
/// # tokio_test_block_on(async {
/// let driver = InMemoryDriver::new();
/// let id = CollectionId::from("root");
/// driver
///     .create_collection(CollectionRecord::new(id.clone(), "root", None))
///     .await
///     .unwrap();
/// assert_eq!(driver.get_collection(&id).await.unwrap().name, "root");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDriver {
    state: RwLock<State>,
}

impl InMemoryDriver {
    /// Creates an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored collections.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.state.read().collections.len()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.state.read().documents.len()
    }

    /// Returns a stored collection record, if any.
    #[must_use]
    pub fn collection(&self, id: &CollectionId) -> Option<CollectionRecord> {
        self.state
            .read()
            .collections
            .get(id)
            .map(|c| c.record.clone())
    }

    /// Returns the names of the direct sub-collections of `id`, in creation order.
    #[must_use]
    pub fn child_names(&self, id: &CollectionId) -> Vec<String> {
        self.state
            .read()
            .children_of(id)
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    /// Returns the documents owned by `id`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored payload cannot be decoded.
    pub fn documents_of(&self, id: &CollectionId) -> DriverResult<Vec<Document>> {
        self.state.read().documents_of(id)
    }
}

#[async_trait]
impl Driver for InMemoryDriver {
    async fn get_collection(&self, id: &CollectionId) -> DriverResult<CollectionRecord> {
        self.collection(id)
            .ok_or_else(|| DriverError::not_found(RecordKind::Collection, id.as_str()))
    }

    async fn create_collection(&self, record: CollectionRecord) -> DriverResult<()> {
        let mut state = self.state.write();
        if state.collections.contains_key(&record.id) {
            return Err(DriverError::already_exists(
                RecordKind::Collection,
                record.id.as_str(),
            ));
        }
        let seq = state.next_seq();
        state
            .collections
            .insert(record.id.clone(), StoredCollection { record, seq });
        Ok(())
    }

    async fn get_subcollections(&self, id: &CollectionId) -> DriverResult<Vec<CollectionRecord>> {
        Ok(self.state.read().children_of(id))
    }

    async fn get_documents(&self, id: &CollectionId) -> DriverResult<Vec<Document>> {
        self.state.read().documents_of(id)
    }

    async fn delete_collection(&self, id: &CollectionId) -> DriverResult<()> {
        let mut state = self.state.write();
        if !state.collections.contains_key(id) {
            return Err(DriverError::not_found(RecordKind::Collection, id.as_str()));
        }
        state.remove_subtree(id);
        Ok(())
    }

    async fn create_document(&self, document: Document) -> DriverResult<()> {
        let payload = to_cbor(&document.value)?;
        let mut state = self.state.write();
        if state.documents.contains_key(&document.id) {
            return Err(DriverError::already_exists(
                RecordKind::Document,
                document.id.as_str(),
            ));
        }
        let seq = state.next_seq();
        state.documents.insert(
            document.id,
            StoredDocument {
                parent_id: document.parent_id,
                key: document.key,
                payload,
                seq,
            },
        );
        Ok(())
    }

    async fn update_document(&self, id: &str, value: Value) -> DriverResult<()> {
        let payload = to_cbor(&value)?;
        let mut state = self.state.write();
        if let Some(doc) = state.documents.get_mut(id) {
            doc.payload = payload;
            return Ok(());
        }
        if state.collections.contains_key(id) {
            // Legacy call shape: a collection id where a document id belongs.
            tracing::debug!(collection_id = %id, "update_document addressed a collection; ignored");
            return Ok(());
        }
        Err(DriverError::not_found(RecordKind::Document, id))
    }

    async fn delete_document(&self, id: &DocumentId) -> DriverResult<()> {
        self.state
            .write()
            .documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DriverError::not_found(RecordKind::Document, id.as_str()))
    }

    async fn query_documents(
        &self,
        collection_id: &CollectionId,
        query: &QueryModel,
    ) -> DriverResult<Vec<Document>> {
        let docs = self.state.read().documents_of(collection_id)?;
        Ok(query.apply(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterOp, SortOrder};

    fn record(id: &str, name: &str, parent: Option<&str>) -> CollectionRecord {
        CollectionRecord::new(id.into(), name, parent.map(CollectionId::from))
    }

    fn doc(id: &str, parent: &str, key: &str, value: Value) -> Document {
        Document::new(id.into(), parent.into(), key, value)
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let driver = InMemoryDriver::new();
        let err = driver.get_collection(&"nope".into()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_collection_id_is_rejected() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        let err = driver
            .create_collection(record("r", "other", None))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::AlreadyExists { kind: RecordKind::Collection, .. }));
    }

    #[tokio::test]
    async fn subcollections_are_direct_children_in_creation_order() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        driver.create_collection(record("b", "b", Some("r"))).await.unwrap();
        driver.create_collection(record("a", "a", Some("r"))).await.unwrap();
        driver.create_collection(record("g", "g", Some("a"))).await.unwrap();

        let children = driver.get_subcollections(&"r".into()).await.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn delete_collection_removes_subtree() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        driver.create_collection(record("a", "a", Some("r"))).await.unwrap();
        driver.create_collection(record("g", "g", Some("a"))).await.unwrap();
        driver.create_document(doc("d1", "g", "k", Value::Integer(1))).await.unwrap();
        driver.create_document(doc("d2", "r", "k", Value::Integer(2))).await.unwrap();

        driver.delete_collection(&"a".into()).await.unwrap();

        assert_eq!(driver.collection_count(), 1);
        assert_eq!(driver.document_count(), 1);
        assert!(driver.collection(&"g".into()).is_none());
    }

    #[tokio::test]
    async fn update_document_overwrites_value() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        driver.create_document(doc("d1", "r", "k", Value::from("old"))).await.unwrap();

        driver.update_document("d1", Value::from("new")).await.unwrap();

        let docs = driver.get_documents(&"r".into()).await.unwrap();
        assert_eq!(docs[0].value, Value::from("new"));
    }

    #[tokio::test]
    async fn update_addressed_at_collection_is_ignored() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        driver.create_document(doc("d1", "r", "k", Value::from("old"))).await.unwrap();

        driver.update_document("r", Value::from("new")).await.unwrap();

        let docs = driver.documents_of(&"r".into()).unwrap();
        assert_eq!(docs[0].value, Value::from("old"));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let driver = InMemoryDriver::new();
        let err = driver.update_document("ghost", Value::Null).await.unwrap_err();
        assert!(matches!(err, DriverError::NotFound { kind: RecordKind::Document, .. }));
    }

    #[tokio::test]
    async fn delete_document_of_unknown_id_is_not_found() {
        let driver = InMemoryDriver::new();
        assert!(driver.delete_document(&"ghost".into()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn query_filters_sorts_and_limits() {
        let driver = InMemoryDriver::new();
        driver.create_collection(record("r", "root", None)).await.unwrap();
        for (i, age) in [30, 12, 45, 27].into_iter().enumerate() {
            let value = Value::map([("age", Value::Integer(age))]);
            driver
                .create_document(doc(&format!("d{i}"), "r", &format!("k{i}"), value))
                .await
                .unwrap();
        }

        let query = QueryModel::new("/root")
            .filter("age", FilterOp::Gte, 18)
            .sort_by("age", SortOrder::Descending)
            .limit(2);
        let hits = driver.query_documents(&"r".into(), &query).await.unwrap();

        let keys: Vec<&str> = hits.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["k2", "k0"]);
    }

    #[tokio::test]
    async fn query_on_empty_collection_returns_nothing() {
        let driver = InMemoryDriver::new();
        let hits = driver
            .query_documents(&"r".into(), &QueryModel::new("/root"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
