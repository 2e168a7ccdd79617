//! Collection node: cached children plus the driver synchronization protocol.
//!
//! Every mutating operation is one step from the caller's point of view:
//!
//! 1. Check the local cache (duplicate name, existing key, missing target)
//! 2. Call the driver
//! 3. On success, update the cache and emit exactly one change event
//! 4. On failure, return the error with the cache untouched
//!
//! Mutations take `&mut self`, so two mutations on the same node can never
//! interleave their driver calls.

use crate::config::{CollectionConfig, UpdateTarget};
use crate::error::{CollectionError, CollectionResult};
use crate::event::ChangeEvent;
use crate::notify::Notifier;
use crate::outcome::{CreateOutcome, DeleteOutcome, FetchReport, TreeFetchReport, UpsertOutcome};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use treedoc_codec::Value;
use treedoc_driver::{
    CollectionId, CollectionRecord, Document, DocumentId, Driver, DriverResult, QueryModel,
};

/// A node in the collection tree.
///
/// A node caches its direct sub-collections and documents. Deeper levels are
/// only populated by fetching each child explicitly (or with
/// [`Collection::fetch_tree`]).
///
/// The driver and notifier are shared with every other node of the tree;
/// the caches are owned by this node alone.
pub struct Collection {
    driver: Arc<dyn Driver>,
    notifier: Arc<dyn Notifier>,
    config: CollectionConfig,
    path: String,
    parent_id: Option<CollectionId>,
    id: CollectionId,
    name: String,
    subcollections: Vec<Collection>,
    documents: Vec<Document>,
}

impl Collection {
    /// Creates a node.
    ///
    /// Nothing is loaded: call [`fetch`](Self::fetch) to populate the caches.
    pub fn new(
        driver: Arc<dyn Driver>,
        notifier: Arc<dyn Notifier>,
        path: impl Into<String>,
        parent_id: Option<CollectionId>,
        id: CollectionId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            notifier,
            config: CollectionConfig::default(),
            path: path.into(),
            parent_id,
            id,
            name: name.into(),
            subcollections: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Creates a root node with a fresh id. Its path is `/<name>`.
    pub fn root(driver: Arc<dyn Driver>, notifier: Arc<dyn Notifier>, name: &str) -> Self {
        Self::root_with_id(driver, notifier, CollectionId::generate(), name)
    }

    /// Creates a root node with a known id, e.g. one persisted by an earlier run.
    pub fn root_with_id(
        driver: Arc<dyn Driver>,
        notifier: Arc<dyn Notifier>,
        id: CollectionId,
        name: &str,
    ) -> Self {
        Self::new(driver, notifier, format!("/{name}"), None, id, name)
    }

    /// Replaces this node's configuration.
    ///
    /// Children created or fetched afterwards inherit it.
    #[must_use]
    pub fn with_config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the collection id.
    pub fn id(&self) -> &CollectionId {
        &self.id
    }

    /// Returns the owning collection's id, or `None` for a root.
    pub fn parent_id(&self) -> Option<&CollectionId> {
        self.parent_id.as_ref()
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path used to address this node's events.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Returns the cached sub-collections.
    pub fn subcollections(&self) -> &[Collection] {
        &self.subcollections
    }

    /// Returns the cached documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Looks up a cached sub-collection by name.
    pub fn subcollection(&self, name: &str) -> Option<&Collection> {
        self.subcollections.iter().find(|c| c.name == name)
    }

    /// Looks up a cached sub-collection by name, mutably.
    pub fn subcollection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.subcollections.iter_mut().find(|c| c.name == name)
    }

    /// Looks up a cached document by key.
    pub fn document(&self, key: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.key == key)
    }

    fn record(&self) -> CollectionRecord {
        CollectionRecord::new(self.id.clone(), self.name.clone(), self.parent_id.clone())
    }

    fn child(&self, id: CollectionId, name: String) -> Collection {
        Collection {
            driver: Arc::clone(&self.driver),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
            path: format!("{}/{}", self.path, name),
            parent_id: Some(self.id.clone()),
            id,
            name,
            subcollections: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Runs one driver call, bounded by the configured timeout.
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = DriverResult<T>>,
    ) -> CollectionResult<T> {
        match self.config.driver_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CollectionError::Timeout { operation })?
                .map_err(CollectionError::from),
            None => fut.await.map_err(CollectionError::from),
        }
    }

    /// Resynchronizes this node's direct children with the driver.
    ///
    /// 1. Fetch this collection's own record; if that fails, create it. If
    ///    the create fails too, log and stop with every cache unchanged.
    /// 2. Replace the sub-collection cache wholesale with fresh nodes for
    ///    the driver's current children.
    /// 3. If `load_documents`, replace the document cache wholesale.
    ///
    /// Driver calls run strictly in that order. Grandchildren are never
    /// touched. A failed step 2 or 3 leaves that cache as it was.
    pub async fn fetch(&mut self, load_documents: bool) -> FetchReport {
        let mut report = FetchReport::default();

        if let Err(err) = self
            .call("get_collection", self.driver.get_collection(&self.id))
            .await
        {
            debug!(collection_id = %self.id, error = %err, "collection record unavailable, creating it");
            if let Err(err) = self
                .call("create_collection", self.driver.create_collection(self.record()))
                .await
            {
                error!(
                    collection_id = %self.id,
                    name = %self.name,
                    error = %err,
                    "failed to create collection record, fetch aborted"
                );
                report.aborted = true;
                return report;
            }
            info!(collection_id = %self.id, name = %self.name, path = %self.path, "created missing collection record");
            report.bootstrapped = true;
        }

        match self
            .call("get_subcollections", self.driver.get_subcollections(&self.id))
            .await
        {
            Ok(children) => {
                self.subcollections = children
                    .into_iter()
                    .map(|c| self.child(c.id, c.name))
                    .collect();
                report.subcollections_loaded = true;
            }
            Err(err) => {
                warn!(collection_id = %self.id, error = %err, "failed to load sub-collections, cache kept");
            }
        }

        if load_documents {
            match self
                .call("get_documents", self.driver.get_documents(&self.id))
                .await
            {
                Ok(docs) => {
                    self.documents = docs;
                    report.documents_loaded = true;
                }
                Err(err) => {
                    warn!(collection_id = %self.id, error = %err, "failed to load documents, cache kept");
                }
            }
        }

        debug!(
            collection_id = %self.id,
            subcollections = self.subcollections.len(),
            documents = self.documents.len(),
            "fetch complete"
        );
        report
    }

    /// Fetches this node, then every descendant depth-first.
    ///
    /// Each level is one ordinary [`fetch`](Self::fetch). The children of a
    /// node whose fetch aborted are skipped.
    pub fn fetch_tree(
        &mut self,
        load_documents: bool,
    ) -> Pin<Box<dyn Future<Output = TreeFetchReport> + Send + '_>> {
        Box::pin(async move {
            let mut tree = TreeFetchReport::default();
            let report = self.fetch(load_documents).await;
            tree.record(report);
            if report.aborted {
                return tree;
            }
            for child in &mut self.subcollections {
                tree.merge(child.fetch_tree(load_documents).await);
            }
            tree
        })
    }

    /// Creates a sub-collection named `name`.
    ///
    /// A cached sibling with the same name makes this a no-op
    /// ([`CreateOutcome::AlreadyExists`]): no driver call, no event.
    pub async fn create_subcollection(&mut self, name: &str) -> CollectionResult<CreateOutcome> {
        if let Some(existing) = self.subcollection(name) {
            debug!(collection_id = %self.id, name, "sub-collection already exists");
            return Ok(CreateOutcome::AlreadyExists(existing.id.clone()));
        }

        let id = CollectionId::generate();
        let record = CollectionRecord::new(id.clone(), name, Some(self.id.clone()));
        self.call("create_collection", self.driver.create_collection(record))
            .await?;

        let child = self.child(id.clone(), name.to_string());
        self.subcollections.push(child);
        self.notifier
            .notify(ChangeEvent::collection_added(id.clone(), self.path.clone()));
        debug!(collection_id = %self.id, child_id = %id, name, "sub-collection created");
        Ok(CreateOutcome::Created(id))
    }

    /// Deletes the sub-collection named `name`.
    ///
    /// No cached sibling with that name makes this a no-op. On driver failure
    /// the child stays cached.
    pub async fn delete_subcollection(
        &mut self,
        name: &str,
    ) -> CollectionResult<DeleteOutcome<CollectionId>> {
        let Some(index) = self.subcollections.iter().position(|c| c.name == name) else {
            debug!(collection_id = %self.id, name, "no sub-collection to delete");
            return Ok(DeleteOutcome::NotFound);
        };

        let id = self.subcollections[index].id.clone();
        self.call("delete_collection", self.driver.delete_collection(&id))
            .await?;

        self.subcollections.remove(index);
        self.notifier
            .notify(ChangeEvent::collection_deleted(id.clone(), self.path.clone()));
        debug!(collection_id = %self.id, child_id = %id, name, "sub-collection deleted");
        Ok(DeleteOutcome::Deleted(id))
    }

    /// Creates a document, or replaces the value of the one cached under `key`.
    ///
    /// Without a key the document is always created and keyed by its new id.
    pub async fn create_document(
        &mut self,
        value: Value,
        key: Option<&str>,
    ) -> CollectionResult<UpsertOutcome> {
        self.upsert(value, key, UpdateTarget::Document).await
    }

    /// Same contract as [`create_document`](Self::create_document).
    ///
    /// On an existing key, the id sent to the driver's update call follows
    /// [`CollectionConfig::update_target`].
    pub async fn update_document(
        &mut self,
        value: Value,
        key: Option<&str>,
    ) -> CollectionResult<UpsertOutcome> {
        let target = self.config.update_target;
        self.upsert(value, key, target).await
    }

    async fn upsert(
        &mut self,
        value: Value,
        key: Option<&str>,
        target: UpdateTarget,
    ) -> CollectionResult<UpsertOutcome> {
        // An omitted key never matches: documents without one are keyed by id.
        let existing = key.and_then(|k| self.documents.iter().position(|d| d.key == k));

        let (Some(index), Some(key)) = (existing, key) else {
            return self.insert_document(value, key).await;
        };

        let doc_id = self.documents[index].id.clone();
        let driver_id = match target {
            UpdateTarget::Document => doc_id.as_str(),
            UpdateTarget::LegacyCollectionId => self.id.as_str(),
        };
        self.call(
            "update_document",
            self.driver.update_document(driver_id, value.clone()),
        )
        .await?;

        self.documents[index].value = value.clone();
        // The event echoes the caller's key.
        self.notifier.notify(ChangeEvent::document_updated(
            self.id.clone(),
            key,
            value,
            self.path.clone(),
        ));
        debug!(collection_id = %self.id, key, document_id = %doc_id, "document updated");
        Ok(UpsertOutcome::Updated(doc_id))
    }

    async fn insert_document(
        &mut self,
        value: Value,
        key: Option<&str>,
    ) -> CollectionResult<UpsertOutcome> {
        let id = DocumentId::generate();
        let key = key.map_or_else(|| id.to_key(), str::to_string);
        let document = Document::new(id.clone(), self.id.clone(), key.clone(), value.clone());

        self.call("create_document", self.driver.create_document(document.clone()))
            .await?;

        self.documents.push(document);
        self.notifier.notify(ChangeEvent::document_added(
            self.id.clone(),
            key.as_str(),
            value,
            self.path.clone(),
        ));
        debug!(collection_id = %self.id, key = %key, document_id = %id, "document created");
        Ok(UpsertOutcome::Created(id))
    }

    /// Deletes the document cached under `key`.
    ///
    /// No cached document with that key makes this a no-op: no driver call,
    /// no event.
    pub async fn delete_document(
        &mut self,
        key: &str,
    ) -> CollectionResult<DeleteOutcome<DocumentId>> {
        let Some(index) = self.documents.iter().position(|d| d.key == key) else {
            debug!(collection_id = %self.id, key, "no document to delete");
            return Ok(DeleteOutcome::NotFound);
        };

        let id = self.documents[index].id.clone();
        self.call("delete_document", self.driver.delete_document(&id))
            .await?;

        self.documents.remove(index);
        self.notifier.notify(ChangeEvent::document_deleted(
            self.id.clone(),
            key,
            self.path.clone(),
        ));
        debug!(collection_id = %self.id, key, document_id = %id, "document deleted");
        Ok(DeleteOutcome::Deleted(id))
    }

    /// Runs `query` through the driver and publishes the result set.
    ///
    /// Nothing is cached. Exactly one `{Document, Query}` event is emitted,
    /// addressed to `query.collection_path`, even when the driver fails (the
    /// result set is then empty and the error is also returned).
    ///
    /// Returns the number of documents in the result set.
    pub async fn query(&self, query: &QueryModel) -> CollectionResult<usize> {
        let result = self
            .call("query_documents", self.driver.query_documents(&self.id, query))
            .await;

        let (docs, outcome) = match result {
            Ok(docs) => {
                let count = docs.len();
                (docs, Ok(count))
            }
            Err(err) => {
                warn!(collection_id = %self.id, error = %err, "query failed, publishing empty result");
                (Vec::new(), Err(err))
            }
        };

        self.notifier.notify(ChangeEvent::query(
            self.id.clone(),
            query.collection_path.clone(),
            docs,
        ));
        outcome
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("subcollections", &self.subcollections)
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeFeed;
    use crate::event::{ChangeSubject, ChangeType};
    use treedoc_driver::InMemoryDriver;

    fn setup() -> (Arc<InMemoryDriver>, Arc<ChangeFeed>, Collection) {
        let driver = Arc::new(InMemoryDriver::new());
        let feed = Arc::new(ChangeFeed::new());
        let root = Collection::root_with_id(driver.clone(), feed.clone(), "R".into(), "root");
        (driver, feed, root)
    }

    #[test]
    fn root_identity() {
        let (_, _, root) = setup();
        assert_eq!(root.id().as_str(), "R");
        assert_eq!(root.name(), "root");
        assert_eq!(root.path(), "/root");
        assert!(root.parent_id().is_none());
        assert!(root.subcollections().is_empty());
        assert!(root.documents().is_empty());
    }

    #[tokio::test]
    async fn fetch_bootstraps_missing_record() {
        let (driver, feed, mut root) = setup();

        let report = root.fetch(false).await;

        assert!(report.bootstrapped);
        assert!(!report.aborted);
        assert!(report.subcollections_loaded);
        assert!(!report.documents_loaded);
        assert_eq!(driver.collection(&"R".into()).unwrap().name, "root");
        assert_eq!(feed.history_len(), 0);
    }

    #[tokio::test]
    async fn children_inherit_identity_and_config() {
        let (_, _, root) = setup();
        let config = CollectionConfig::new().with_update_target(UpdateTarget::LegacyCollectionId);
        let mut root = root.with_config(config);

        root.create_subcollection("a").await.unwrap();
        let child = root.subcollection("a").unwrap();

        assert_eq!(child.path(), "/root/a");
        assert_eq!(child.parent_id(), Some(root.id()));
        assert_eq!(child.config().update_target, UpdateTarget::LegacyCollectionId);
    }

    #[tokio::test]
    async fn omitted_key_always_creates() {
        let (_, feed, mut root) = setup();

        let first = root.create_document(Value::Integer(1), None).await.unwrap();
        let second = root.create_document(Value::Integer(2), None).await.unwrap();

        assert!(matches!(first, UpsertOutcome::Created(_)));
        assert!(matches!(second, UpsertOutcome::Created(_)));
        assert_eq!(root.documents().len(), 2);
        assert_eq!(root.documents()[0].key, first.id().as_str());

        let kinds: Vec<(ChangeSubject, ChangeType)> = feed
            .events()
            .iter()
            .map(|e| (e.subject, e.change_type))
            .collect();
        assert_eq!(kinds, vec![(ChangeSubject::Document, ChangeType::Added); 2]);
    }

    #[tokio::test]
    async fn query_leaves_caches_alone() {
        let (_, feed, mut root) = setup();
        root.create_document(Value::from("x"), Some("k")).await.unwrap();
        let before = root.documents().to_vec();

        let count = root.query(&QueryModel::new("/elsewhere")).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(root.documents(), before.as_slice());
        assert_eq!(feed.events().last().unwrap().path(), "/elsewhere");
    }
}
