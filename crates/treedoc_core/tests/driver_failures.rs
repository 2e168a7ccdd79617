//! Driver failure, timeout and legacy call-shape behaviour.

use std::time::Duration;
use treedoc_core::{
    ChangeEvent, ChangePayload, CollectionConfig, CollectionError, DriverError, QueryModel,
    UpdateTarget, UpsertOutcome, Value,
};
use treedoc_testkit::prelude::*;

fn unavailable() -> CollectionError {
    CollectionError::Driver(DriverError::Unavailable)
}

#[tokio::test]
async fn failed_create_subcollection_leaves_cache() {
    let mut tree = TestTree::fetched().await;
    tree.driver
        .fail_once(DriverOp::CreateCollection, DriverError::Unavailable);

    let err = tree.root.create_subcollection("a").await.unwrap_err();

    assert_eq!(err, unavailable());
    assert!(tree.root.subcollections().is_empty());
    assert!(tree.events().is_empty());

    // The failure was one-shot: retrying succeeds.
    assert!(tree.root.create_subcollection("a").await.unwrap().is_created());
}

#[tokio::test]
async fn failed_delete_subcollection_keeps_child() {
    let mut tree = TestTree::fetched().await;
    tree.root.create_subcollection("a").await.unwrap();
    tree.driver
        .fail_always(DriverOp::DeleteCollection, DriverError::backend("disk full"));

    let err = tree.root.delete_subcollection("a").await.unwrap_err();

    assert_eq!(err.driver_error(), Some(&DriverError::backend("disk full")));
    assert!(tree.root.subcollection("a").is_some());
    assert_eq!(tree.events().len(), 1);
}

#[tokio::test]
async fn failed_create_document_leaves_cache() {
    let mut tree = TestTree::fetched().await;
    tree.driver
        .fail_once(DriverOp::CreateDocument, DriverError::Unavailable);

    let err = tree
        .root
        .create_document(Value::Integer(1), Some("k"))
        .await
        .unwrap_err();

    assert_eq!(err, unavailable());
    assert!(tree.root.documents().is_empty());
    assert_eq!(tree.driver.inner().document_count(), 0);
    assert!(tree.events().is_empty());
}

#[tokio::test]
async fn failed_update_keeps_old_value() {
    let mut tree = TestTree::fetched().await;
    tree.root
        .create_document(Value::from("old"), Some("k"))
        .await
        .unwrap();
    tree.driver
        .fail_once(DriverOp::UpdateDocument, DriverError::Unavailable);

    let err = tree
        .root
        .update_document(Value::from("new"), Some("k"))
        .await
        .unwrap_err();

    assert_eq!(err, unavailable());
    assert_eq!(tree.root.document("k").unwrap().value, Value::from("old"));
    assert_eq!(tree.events().len(), 1);
}

#[tokio::test]
async fn failed_delete_document_keeps_document() {
    let mut tree = TestTree::fetched().await;
    tree.root.create_document(Value::Null, Some("k")).await.unwrap();
    tree.driver
        .fail_once(DriverOp::DeleteDocument, DriverError::Unavailable);

    assert_eq!(tree.root.delete_document("k").await.unwrap_err(), unavailable());
    assert!(tree.root.document("k").is_some());
    assert_eq!(tree.driver.inner().document_count(), 1);
}

#[tokio::test]
async fn fetch_aborts_when_record_cannot_be_created() {
    init_tracing();
    let mut tree = TestTree::fetched().await;
    tree.root.create_subcollection("a").await.unwrap();
    tree.root.create_document(Value::Bool(true), Some("k")).await.unwrap();
    tree.driver.clear_calls();
    tree.driver
        .fail_always(DriverOp::GetCollection, DriverError::Unavailable);
    tree.driver
        .fail_always(DriverOp::CreateCollection, DriverError::Unavailable);

    let report = tree.root.fetch(true).await;

    assert!(report.aborted);
    assert!(!report.bootstrapped);
    let ops: Vec<DriverOp> = tree.driver.calls().iter().map(DriverCall::op).collect();
    assert_eq!(ops, vec![DriverOp::GetCollection, DriverOp::CreateCollection]);
    assert!(tree.root.subcollection("a").is_some());
    assert!(tree.root.document("k").is_some());
}

#[tokio::test]
async fn fetch_tree_skips_children_of_aborted_node() {
    let mut tree = TestTree::new();
    tree.driver
        .fail_always(DriverOp::CreateCollection, DriverError::Unavailable);

    let report = tree.root.fetch_tree(true).await;

    assert_eq!(report.nodes, 1);
    assert_eq!(report.aborted, 1);
    assert_eq!(tree.driver.count(DriverOp::GetSubcollections), 0);
}

#[tokio::test]
async fn failed_child_load_keeps_cache_and_continues() {
    let mut tree = TestTree::fetched().await;
    tree.root.create_subcollection("a").await.unwrap();
    tree.driver
        .fail_once(DriverOp::GetSubcollections, DriverError::Unavailable);

    let report = tree.root.fetch(true).await;

    assert!(!report.aborted);
    assert!(!report.subcollections_loaded);
    assert!(report.documents_loaded);
    assert!(tree.root.subcollection("a").is_some());
    assert_eq!(tree.driver.count(DriverOp::GetDocuments), 1);
}

#[tokio::test]
async fn failed_document_load_keeps_cached_documents() {
    let mut tree = TestTree::fetched().await;
    tree.root
        .create_document(Value::from("cached"), Some("k"))
        .await
        .unwrap();

    let mut other = tree.reopen_root();
    other.fetch(true).await;
    other.delete_document("k").await.unwrap();
    other.create_subcollection("fresh").await.unwrap();
    tree.driver
        .fail_once(DriverOp::GetDocuments, DriverError::Unavailable);

    let report = tree.root.fetch(true).await;

    assert!(!report.aborted);
    assert!(report.subcollections_loaded);
    assert!(!report.documents_loaded);
    assert!(tree.root.subcollection("fresh").is_some());
    assert_eq!(tree.root.document("k").unwrap().value, Value::from("cached"));
    assert_eq!(tree.driver.inner().document_count(), 0);
}

#[tokio::test]
async fn failed_query_publishes_empty_result() {
    let tree = TestTree::fetched().await;
    tree.driver
        .fail_once(DriverOp::QueryDocuments, DriverError::Unavailable);

    let err = tree.root.query(&QueryModel::new("/root")).await.unwrap_err();

    assert_eq!(err, unavailable());
    let events = tree.events();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        ChangePayload::Query { docs, path, .. } => {
            assert!(docs.is_empty());
            assert_eq!(path, "/root");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn slow_driver_call_times_out_without_side_effects() {
    let config = CollectionConfig::new().with_driver_timeout(Duration::from_millis(20));
    let mut tree = TestTree::fetched_with_config(config).await;
    tree.driver
        .delay(DriverOp::CreateDocument, Duration::from_millis(500));

    let err = tree
        .root
        .create_document(Value::Integer(1), Some("k"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CollectionError::Timeout {
            operation: "create_document"
        }
    );
    assert!(tree.root.documents().is_empty());
    assert_eq!(tree.driver.inner().document_count(), 0);
    assert!(tree.events().is_empty());
}

#[tokio::test]
async fn timeout_during_fetch_keeps_children() {
    let config = CollectionConfig::new().with_driver_timeout(Duration::from_millis(20));
    let mut tree = TestTree::fetched_with_config(config).await;
    tree.root.create_subcollection("a").await.unwrap();
    tree.driver
        .delay(DriverOp::GetSubcollections, Duration::from_millis(500));

    let report = tree.root.fetch(false).await;

    assert!(!report.subcollections_loaded);
    assert!(tree.root.subcollection("a").is_some());
}

#[tokio::test]
async fn legacy_update_target_sends_collection_id() {
    let config = CollectionConfig::new().with_update_target(UpdateTarget::LegacyCollectionId);
    let mut tree = TestTree::fetched_with_config(config).await;
    tree.root
        .create_document(Value::from("v1"), Some("k"))
        .await
        .unwrap();

    let outcome = tree
        .root
        .update_document(Value::from("v2"), Some("k"))
        .await
        .unwrap();

    assert!(matches!(outcome, UpsertOutcome::Updated(_)));
    assert_eq!(
        tree.driver.calls_of(DriverOp::UpdateDocument),
        vec![DriverCall::UpdateDocument {
            id: ROOT_ID.to_string(),
            value: Value::from("v2"),
        }]
    );
    // The cache and the event follow the caller; the in-memory driver
    // ignores an update addressed at a collection.
    assert_eq!(tree.root.document("k").unwrap().value, Value::from("v2"));
    let stored = tree.driver.inner().documents_of(tree.root.id()).unwrap();
    assert_eq!(stored[0].value, Value::from("v1"));
    assert_eq!(
        tree.events().last(),
        Some(&ChangeEvent::document_updated(
            ROOT_ID.into(),
            "k",
            Value::from("v2"),
            "/root"
        ))
    );
}

#[tokio::test]
async fn create_document_ignores_legacy_target() {
    let config = CollectionConfig::new().with_update_target(UpdateTarget::LegacyCollectionId);
    let mut tree = TestTree::fetched_with_config(config).await;
    let id = tree
        .root
        .create_document(Value::from("v1"), Some("k"))
        .await
        .unwrap()
        .id()
        .clone();

    tree.root
        .create_document(Value::from("v2"), Some("k"))
        .await
        .unwrap();

    assert_eq!(
        tree.driver.calls_of(DriverOp::UpdateDocument),
        vec![DriverCall::UpdateDocument {
            id: id.to_string(),
            value: Value::from("v2"),
        }]
    );
}
