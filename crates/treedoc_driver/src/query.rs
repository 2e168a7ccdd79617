//! Structured query description.
//!
//! A [`QueryModel`] is data only. The collection tree never looks inside
//! one: it hands the model to the driver and copies `collection_path` into
//! the resulting change event. Drivers are free to interpret filters, sort
//! keys and limits however their backend allows; [`QueryModel::apply`] is
//! the reference interpretation used by the in-memory driver.

use crate::record::Document;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use treedoc_codec::Value;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Field equals the value.
    Eq,
    /// Field differs from the value (a missing field differs from everything).
    Ne,
    /// Field is less than the value.
    Lt,
    /// Field is less than or equal to the value.
    Lte,
    /// Field is greater than the value.
    Gt,
    /// Field is greater than or equal to the value.
    Gte,
    /// Field contains the value (substring, array element or map key).
    Contains,
}

/// A single predicate over one document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Top-level field of the document value.
    pub field: String,
    /// Comparison to apply.
    pub op: FilterOp,
    /// Right-hand side of the comparison.
    pub value: Value,
}

impl Filter {
    /// Creates a filter.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Returns true if `doc` satisfies this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = resolve_field(doc, &self.field) else {
            return self.op == FilterOp::Ne;
        };
        let ord = actual.compare(&self.value);
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Ne => ord != Ordering::Equal,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Lte => ord != Ordering::Greater,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Gte => ord != Ordering::Less,
            FilterOp::Contains => actual.contains(&self.value),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field to sort by.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// A structured filter/sort/limit description passed opaquely to a driver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryModel {
    /// Path used to address the query's change event.
    pub collection_path: String,
    /// Predicates, all of which must hold.
    pub filters: Vec<Filter>,
    /// Sort keys, most significant first.
    pub sort: Vec<SortKey>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl QueryModel {
    /// Creates an unfiltered query addressed at `collection_path`.
    pub fn new(collection_path: impl Into<String>) -> Self {
        Self {
            collection_path: collection_path.into(),
            ..Self::default()
        }
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    /// Adds a sort key.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order,
        });
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluates this query over `docs`: filter, stable sort, then limit.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut hits: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(doc)))
            .collect();

        if !self.sort.is_empty() {
            hits.sort_by(|a, b| self.compare_docs(a, b));
        }
        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }

    fn compare_docs(&self, a: &Document, b: &Document) -> Ordering {
        for key in &self.sort {
            let av = resolve_field(a, &key.field).unwrap_or(Cow::Owned(Value::Null));
            let bv = resolve_field(b, &key.field).unwrap_or(Cow::Owned(Value::Null));
            let ord = match key.order {
                SortOrder::Ascending => av.compare(&bv),
                SortOrder::Descending => bv.compare(&av),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Looks a field up in the document value, falling back to the record's
/// own `key` and `id` when the value has no such field.
fn resolve_field<'a>(doc: &'a Document, field: &str) -> Option<Cow<'a, Value>> {
    if let Some(v) = doc.value.get(field) {
        return Some(Cow::Borrowed(v));
    }
    match field {
        "key" => Some(Cow::Owned(Value::from(doc.key.as_str()))),
        "id" => Some(Cow::Owned(Value::from(doc.id.as_str()))),
        _ => None,
    }
}
