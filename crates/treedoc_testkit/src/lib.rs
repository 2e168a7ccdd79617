//! # treedoc Testkit
//!
//! Test utilities for treedoc.
//!
//! This crate provides:
//! - [`RecordingDriver`]: call log, fault and latency injection over any driver
//! - [`TestTree`]: a root collection wired to a recording driver and a feed
//! - Property-based generators for values and operation sequences
//! - [`init_tracing`] for log output inside tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use treedoc_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_once() {
//!     let mut tree = TestTree::fetched().await;
//!     tree.root.create_subcollection("a").await.unwrap();
//!     assert_eq!(tree.driver.count(DriverOp::CreateCollection), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
