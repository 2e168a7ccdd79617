//! Data driver trait definition.

use crate::error::DriverResult;
use crate::id::{CollectionId, DocumentId};
use crate::query::QueryModel;
use crate::record::{CollectionRecord, Document};
use async_trait::async_trait;
use std::sync::Arc;
use treedoc_codec::Value;

/// A persistence backend for collections and documents.
///
/// Drivers are the durable source of truth. The collection tree never
/// assumes a driver shares memory with it: every record crosses this
/// boundary by value.
///
/// # Invariants
///
/// - Every operation returns a result; a failure is a value, never a panic
/// - `get_collection` on an unknown id reports `NotFound`
/// - `get_subcollections` and `get_documents` report direct children only
/// - Drivers must be `Send + Sync` so many nodes can share one instance
///
/// # Implementors
///
/// - [`super::InMemoryDriver`] - For testing and ephemeral trees
#[async_trait]
pub trait Driver: Send + Sync {
    /// Fetches a collection's own record.
    async fn get_collection(&self, id: &CollectionId) -> DriverResult<CollectionRecord>;

    /// Creates a collection record.
    async fn create_collection(&self, record: CollectionRecord) -> DriverResult<()>;

    /// Lists the direct sub-collections of `id`.
    async fn get_subcollections(&self, id: &CollectionId) -> DriverResult<Vec<CollectionRecord>>;

    /// Lists the documents owned by `id`.
    async fn get_documents(&self, id: &CollectionId) -> DriverResult<Vec<Document>>;

    /// Deletes a collection record.
    async fn delete_collection(&self, id: &CollectionId) -> DriverResult<()>;

    /// Creates a document record.
    async fn create_document(&self, document: Document) -> DriverResult<()>;

    /// Replaces the value stored under `id`.
    ///
    /// The id is passed through as given. Callers using the legacy call
    /// shape pass a collection id here; see the in-memory driver for how
    /// that is handled.
    async fn update_document(&self, id: &str, value: Value) -> DriverResult<()>;

    /// Deletes a document record.
    async fn delete_document(&self, id: &DocumentId) -> DriverResult<()>;

    /// Runs a query over the documents of `collection_id`.
    async fn query_documents(
        &self,
        collection_id: &CollectionId,
        query: &QueryModel,
    ) -> DriverResult<Vec<Document>>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    async fn get_collection(&self, id: &CollectionId) -> DriverResult<CollectionRecord> {
        (**self).get_collection(id).await
    }

    async fn create_collection(&self, record: CollectionRecord) -> DriverResult<()> {
        (**self).create_collection(record).await
    }

    async fn get_subcollections(&self, id: &CollectionId) -> DriverResult<Vec<CollectionRecord>> {
        (**self).get_subcollections(id).await
    }

    async fn get_documents(&self, id: &CollectionId) -> DriverResult<Vec<Document>> {
        (**self).get_documents(id).await
    }

    async fn delete_collection(&self, id: &CollectionId) -> DriverResult<()> {
        (**self).delete_collection(id).await
    }

    async fn create_document(&self, document: Document) -> DriverResult<()> {
        (**self).create_document(document).await
    }

    async fn update_document(&self, id: &str, value: Value) -> DriverResult<()> {
        (**self).update_document(id, value).await
    }

    async fn delete_document(&self, id: &DocumentId) -> DriverResult<()> {
        (**self).delete_document(id).await
    }

    async fn query_documents(
        &self,
        collection_id: &CollectionId,
        query: &QueryModel,
    ) -> DriverResult<Vec<Document>> {
        (**self).query_documents(collection_id, query).await
    }
}
