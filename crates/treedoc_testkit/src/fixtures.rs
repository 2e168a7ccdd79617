//! Test fixtures and tree helpers.

use crate::recording::RecordingDriver;
use std::sync::{Arc, Once};
use treedoc_core::{ChangeEvent, ChangeFeed, Collection, CollectionConfig, CollectionId};

/// Id of the root collection built by [`TestTree`].
pub const ROOT_ID: &str = "R";

/// Name of the root collection built by [`TestTree`].
pub const ROOT_NAME: &str = "root";

/// A root collection wired to a recording in-memory driver and a change feed.
pub struct TestTree {
    /// The recording driver shared by every node of the tree.
    pub driver: Arc<RecordingDriver>,
    /// The change feed shared by every node of the tree.
    pub feed: Arc<ChangeFeed>,
    /// The root node, id [`ROOT_ID`], path `/root`.
    pub root: Collection,
}

impl TestTree {
    /// Creates an unfetched tree with default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// Creates an unfetched tree with `config`.
    pub fn with_config(config: CollectionConfig) -> Self {
        let driver = Arc::new(RecordingDriver::new());
        let feed = Arc::new(ChangeFeed::new());
        let root = Collection::root_with_id(
            driver.clone(),
            feed.clone(),
            CollectionId::from(ROOT_ID),
            ROOT_NAME,
        )
        .with_config(config);
        Self { driver, feed, root }
    }

    /// Creates a tree whose root record already exists in the driver, with
    /// the driver's call log cleared.
    pub async fn fetched() -> Self {
        Self::fetched_with_config(CollectionConfig::default()).await
    }

    /// Like [`TestTree::fetched`], with `config` applied to the root.
    pub async fn fetched_with_config(config: CollectionConfig) -> Self {
        let mut tree = Self::with_config(config);
        tree.root.fetch(true).await;
        tree.driver.clear_calls();
        tree
    }

    /// Returns every event published so far.
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.feed.events()
    }

    /// Builds a second, independent node over the same driver and feed for
    /// the root collection, as another process would see it.
    pub fn reopen_root(&self) -> Collection {
        Collection::root_with_id(
            self.driver.clone(),
            self.feed.clone(),
            CollectionId::from(ROOT_ID),
            ROOT_NAME,
        )
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; defaults to `treedoc_core=debug`. Safe to call from
/// every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("treedoc_core=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
