//! Property-based test generators using proptest.

use proptest::prelude::*;
use std::collections::BTreeMap;
use treedoc_codec::Value;

/// Strategy for sibling names drawn from a small pool, so sequences hit
/// duplicates and deletes of existing names often.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
}

/// Strategy for document keys drawn from a small pool.
pub fn document_key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["k1", "k2", "k3", "k4"]).prop_map(str::to_string)
}

/// Strategy for arbitrary document values, nested up to a few levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m: BTreeMap<String, Value>| Value::Map(m)),
        ]
    })
}

/// One operation against a single collection node.
#[derive(Debug, Clone)]
pub enum TreeOp {
    /// `create_subcollection(name)`
    CreateSubcollection(String),
    /// `delete_subcollection(name)`
    DeleteSubcollection(String),
    /// `create_document(value, key)`
    CreateDocument {
        /// Key, or `None` to let the node assign one.
        key: Option<String>,
        /// Value.
        value: Value,
    },
    /// `delete_document(key)`
    DeleteDocument(String),
}

/// Strategy for a single operation.
pub fn tree_op_strategy() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        3 => collection_name_strategy().prop_map(TreeOp::CreateSubcollection),
        2 => collection_name_strategy().prop_map(TreeOp::DeleteSubcollection),
        3 => (prop::option::weighted(0.8, document_key_strategy()), value_strategy())
            .prop_map(|(key, value)| TreeOp::CreateDocument { key, value }),
        2 => document_key_strategy().prop_map(TreeOp::DeleteDocument),
    ]
}

/// Strategy for a sequence of operations.
pub fn tree_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    prop::collection::vec(tree_op_strategy(), 0..max_len)
}
