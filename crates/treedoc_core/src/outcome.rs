//! Named outcomes of collection operations.
//!
//! Duplicate creates and missing deletes are silent no-ops for callers that
//! only check for errors, but the branch taken is still reported so tests
//! and careful callers can tell them apart.

use treedoc_driver::{CollectionId, DocumentId};

/// Result of creating a sub-collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new sub-collection was created with this id.
    Created(CollectionId),
    /// A sibling with the same name was already cached; nothing happened.
    AlreadyExists(CollectionId),
}

impl CreateOutcome {
    /// Returns the id of the sub-collection, new or existing.
    pub fn id(&self) -> &CollectionId {
        match self {
            CreateOutcome::Created(id) | CreateOutcome::AlreadyExists(id) => id,
        }
    }

    /// Returns true if a driver record was created.
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Result of a delete-by-name or delete-by-key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome<Id> {
    /// The record with this id was deleted.
    Deleted(Id),
    /// Nothing matched; no driver call was made.
    NotFound,
}

impl<Id> DeleteOutcome<Id> {
    /// Returns true if something was deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}

/// Result of `create_document` / `update_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new document was created with this id.
    Created(DocumentId),
    /// The document with this id had its value replaced.
    Updated(DocumentId),
}

impl UpsertOutcome {
    /// Returns the id of the affected document.
    pub fn id(&self) -> &DocumentId {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => id,
        }
    }
}

/// What one `fetch` call did.
///
/// Informational only: `fetch` never fails, and a step that failed simply
/// left the corresponding cache as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchReport {
    /// The collection's own record was missing and has been created.
    pub bootstrapped: bool,
    /// The record was missing and could not be created; nothing was loaded.
    pub aborted: bool,
    /// The sub-collection cache was replaced.
    pub subcollections_loaded: bool,
    /// The document cache was replaced.
    pub documents_loaded: bool,
}

/// What one `fetch_tree` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeFetchReport {
    /// Number of nodes fetched.
    pub nodes: usize,
    /// Number of those whose fetch was aborted.
    pub aborted: usize,
    /// Number of those whose record had to be created.
    pub bootstrapped: usize,
}

impl TreeFetchReport {
    pub(crate) fn record(&mut self, report: FetchReport) {
        self.nodes += 1;
        self.aborted += usize::from(report.aborted);
        self.bootstrapped += usize::from(report.bootstrapped);
    }

    pub(crate) fn merge(&mut self, other: TreeFetchReport) {
        self.nodes += other.nodes;
        self.aborted += other.aborted;
        self.bootstrapped += other.bootstrapped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_outcome_accessors() {
        let created = CreateOutcome::Created("a".into());
        let existing = CreateOutcome::AlreadyExists("a".into());
        assert!(created.is_created());
        assert!(!existing.is_created());
        assert_eq!(created.id(), existing.id());
    }

    #[test]
    fn tree_report_accumulates() {
        let mut report = TreeFetchReport::default();
        report.record(FetchReport {
            bootstrapped: true,
            ..FetchReport::default()
        });
        report.record(FetchReport {
            aborted: true,
            ..FetchReport::default()
        });
        assert_eq!(report.nodes, 2);
        assert_eq!(report.aborted, 1);
        assert_eq!(report.bootstrapped, 1);
    }
}
