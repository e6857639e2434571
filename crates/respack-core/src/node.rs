//! Output tree values
//!
//! A [`Node`] is the value owned by a [`Resources`](crate::Resources)
//! container. It mirrors JSON, with one extra variant: a [`Deferred`]
//! computation that is resolved later by
//! [`Resources::map_exec_closure`](crate::Resources::map_exec_closure).
//!
//! Copyright (c) 2025 Respack Team
//! Licensed under the Apache-2.0 license

use crate::Resources;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Signature of a deferred computation
///
/// The function receives the container holding it (read-only) and the key
/// of its own entry, and answers with the edits to apply to that container.
pub type DeferredFn = dyn Fn(&Resources, &str) -> Vec<Instruction> + Send + Sync;

/// A computation stored inside an output tree and resolved in a later pass
#[derive(Clone)]
pub struct Deferred(Arc<DeferredFn>);

impl Deferred {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Resources, &str) -> Vec<Instruction> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A deferred value that removes its own entry when resolved
    pub fn remove() -> Self {
        Self::new(|_, _| vec![Instruction::Remove])
    }

    pub(crate) fn call(&self, container: &Resources, key: &str) -> Vec<Instruction> {
        (self.0)(container, key)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// An edit requested by a deferred computation
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Leave the entry as it is
    Keep,
    /// Replace the entry's value
    Replace(Node),
    /// Remove the entry
    Remove,
    /// Insert a new entry after the current one, or after the previous
    /// insertion
    ///
    /// Once the current entry has been removed there is no position to
    /// insert after, and the entry is appended at the end of the mapping.
    InsertAfter(String, Node),
}

/// A value in an output tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A JSON scalar: null, bool, number or string
    Scalar(Value),
    /// An insertion-ordered mapping
    Map(IndexMap<String, Node>),
    /// An ordered sequence
    List(Vec<Node>),
    /// A computation resolved by `map_exec_closure`
    Deferred(Deferred),
}

impl Default for Node {
    fn default() -> Self {
        Node::Scalar(Value::Null)
    }
}

impl Node {
    /// An empty mapping
    pub fn map() -> Self {
        Node::Map(IndexMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Value::Null))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Node::Deferred(_))
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a direct child by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Convert to JSON
    ///
    /// Deferred values that were never resolved become `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Scalar(value) => value.clone(),
            Node::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, node)| (key.clone(), node.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::List(items) => Value::Array(items.iter().map(Node::to_value).collect()),
            Node::Deferred(_) => Value::Null,
        }
    }

    /// Convert into JSON, consuming the node
    pub fn into_value(self) -> Value {
        match self {
            Node::Scalar(value) => value,
            Node::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(key, node)| (key, node.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
            Node::List(items) => Value::Array(items.into_iter().map(Node::into_value).collect()),
            Node::Deferred(_) => Value::Null,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            scalar => Node::Scalar(scalar),
        }
    }
}

impl From<Deferred> for Node {
    fn from(deferred: Deferred) -> Self {
        Node::Deferred(deferred)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl From<IndexMap<String, Node>> for Node {
    fn from(map: IndexMap<String, Node>) -> Self {
        Node::Map(map)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Scalar(Value::String(value))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Scalar(Value::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Scalar(Value::from(value))
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::Scalar(Value::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Scalar(Value::from(value))
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
