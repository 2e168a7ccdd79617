//! A driver wrapper that records calls and injects faults.
//!
//! Wraps any [`Driver`] (by default the in-memory one) so tests can assert
//! on exactly which driver calls an operation issued, and force specific
//! calls to fail or stall.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use treedoc_codec::Value;
use treedoc_driver::{
    CollectionId, CollectionRecord, Document, DocumentId, Driver, DriverError, DriverResult,
    InMemoryDriver, QueryModel,
};

/// Driver operation names, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    /// `get_collection`
    GetCollection,
    /// `create_collection`
    CreateCollection,
    /// `get_subcollections`
    GetSubcollections,
    /// `get_documents`
    GetDocuments,
    /// `delete_collection`
    DeleteCollection,
    /// `create_document`
    CreateDocument,
    /// `update_document`
    UpdateDocument,
    /// `delete_document`
    DeleteDocument,
    /// `query_documents`
    QueryDocuments,
}

/// One recorded driver call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    /// `get_collection(id)`
    GetCollection {
        /// Requested id.
        id: CollectionId,
    },
    /// `create_collection(record)`
    CreateCollection {
        /// Record to create.
        record: CollectionRecord,
    },
    /// `get_subcollections(id)`
    GetSubcollections {
        /// Parent id.
        id: CollectionId,
    },
    /// `get_documents(id)`
    GetDocuments {
        /// Owning collection id.
        id: CollectionId,
    },
    /// `delete_collection(id)`
    DeleteCollection {
        /// Id to delete.
        id: CollectionId,
    },
    /// `create_document(document)`
    CreateDocument {
        /// Document to create.
        document: Document,
    },
    /// `update_document(id, value)`
    UpdateDocument {
        /// Id passed by the caller.
        id: String,
        /// New value.
        value: Value,
    },
    /// `delete_document(id)`
    DeleteDocument {
        /// Id to delete.
        id: DocumentId,
    },
    /// `query_documents(collection_id, query)`
    QueryDocuments {
        /// Queried collection.
        collection_id: CollectionId,
        /// Query passed through.
        query: QueryModel,
    },
}

impl DriverCall {
    /// Returns the operation this call invoked.
    pub fn op(&self) -> DriverOp {
        match self {
            DriverCall::GetCollection { .. } => DriverOp::GetCollection,
            DriverCall::CreateCollection { .. } => DriverOp::CreateCollection,
            DriverCall::GetSubcollections { .. } => DriverOp::GetSubcollections,
            DriverCall::GetDocuments { .. } => DriverOp::GetDocuments,
            DriverCall::DeleteCollection { .. } => DriverOp::DeleteCollection,
            DriverCall::CreateDocument { .. } => DriverOp::CreateDocument,
            DriverCall::UpdateDocument { .. } => DriverOp::UpdateDocument,
            DriverCall::DeleteDocument { .. } => DriverOp::DeleteDocument,
            DriverCall::QueryDocuments { .. } => DriverOp::QueryDocuments,
        }
    }
}

#[derive(Debug)]
struct Failure {
    error: DriverError,
    /// `None` fails forever.
    remaining: Option<usize>,
}

/// A driver that records every call before delegating to `inner`.
///
/// Injected failures are returned without reaching the inner driver, so
/// its state stays exactly as it was.
#[derive(Debug, Default)]
pub struct RecordingDriver<D = InMemoryDriver> {
    inner: D,
    calls: Mutex<Vec<DriverCall>>,
    failures: Mutex<HashMap<DriverOp, Failure>>,
    delays: Mutex<HashMap<DriverOp, Duration>>,
}

impl RecordingDriver<InMemoryDriver> {
    /// Creates a recording driver over a fresh in-memory driver.
    pub fn new() -> Self {
        Self::wrap(InMemoryDriver::new())
    }
}

impl<D: Driver> RecordingDriver<D> {
    /// Wraps an existing driver.
    pub fn wrap(inner: D) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped driver.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Makes every future call of `op` fail with `error`.
    pub fn fail_always(&self, op: DriverOp, error: DriverError) {
        self.failures.lock().insert(
            op,
            Failure {
                error,
                remaining: None,
            },
        );
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_once(&self, op: DriverOp, error: DriverError) {
        self.failures.lock().insert(
            op,
            Failure {
                error,
                remaining: Some(1),
            },
        );
    }

    /// Removes any injected failure for `op`.
    pub fn heal(&self, op: DriverOp) {
        self.failures.lock().remove(&op);
    }

    /// Makes every future call of `op` sleep for `delay` first.
    pub fn delay(&self, op: DriverOp, delay: Duration) {
        self.delays.lock().insert(op, delay);
    }

    /// Returns every recorded call, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls of one operation.
    pub fn calls_of(&self, op: DriverOp) -> Vec<DriverCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    /// Returns how many times `op` was called.
    pub fn count(&self, op: DriverOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// Returns the total number of recorded calls.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn enter(&self, call: DriverCall) -> DriverResult<()> {
        let op = call.op();
        self.calls.lock().push(call);

        let delay = self.delays.lock().get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut failures = self.failures.lock();
        let Some(failure) = failures.get_mut(&op) else {
            return Ok(());
        };
        let error = failure.error.clone();
        let exhausted = match failure.remaining.as_mut() {
            Some(n) => {
                *n -= 1;
                *n == 0
            }
            None => false,
        };
        if exhausted {
            failures.remove(&op);
        }
        Err(error)
    }
}

#[async_trait]
impl<D: Driver> Driver for RecordingDriver<D> {
    async fn get_collection(&self, id: &CollectionId) -> DriverResult<CollectionRecord> {
        self.enter(DriverCall::GetCollection { id: id.clone() }).await?;
        self.inner.get_collection(id).await
    }

    async fn create_collection(&self, record: CollectionRecord) -> DriverResult<()> {
        self.enter(DriverCall::CreateCollection {
            record: record.clone(),
        })
        .await?;
        self.inner.create_collection(record).await
    }

    async fn get_subcollections(&self, id: &CollectionId) -> DriverResult<Vec<CollectionRecord>> {
        self.enter(DriverCall::GetSubcollections { id: id.clone() })
            .await?;
        self.inner.get_subcollections(id).await
    }

    async fn get_documents(&self, id: &CollectionId) -> DriverResult<Vec<Document>> {
        self.enter(DriverCall::GetDocuments { id: id.clone() }).await?;
        self.inner.get_documents(id).await
    }

    async fn delete_collection(&self, id: &CollectionId) -> DriverResult<()> {
        self.enter(DriverCall::DeleteCollection { id: id.clone() })
            .await?;
        self.inner.delete_collection(id).await
    }

    async fn create_document(&self, document: Document) -> DriverResult<()> {
        self.enter(DriverCall::CreateDocument {
            document: document.clone(),
        })
        .await?;
        self.inner.create_document(document).await
    }

    async fn update_document(&self, id: &str, value: Value) -> DriverResult<()> {
        self.enter(DriverCall::UpdateDocument {
            id: id.to_string(),
            value: value.clone(),
        })
        .await?;
        self.inner.update_document(id, value).await
    }

    async fn delete_document(&self, id: &DocumentId) -> DriverResult<()> {
        self.enter(DriverCall::DeleteDocument { id: id.clone() })
            .await?;
        self.inner.delete_document(id).await
    }

    async fn query_documents(
        &self,
        collection_id: &CollectionId,
        query: &QueryModel,
    ) -> DriverResult<Vec<Document>> {
        self.enter(DriverCall::QueryDocuments {
            collection_id: collection_id.clone(),
            query: query.clone(),
        })
        .await?;
        self.inner.query_documents(collection_id, query).await
    }
}
