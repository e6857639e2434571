//! The mutable container every handler reads from and writes to
//!
//! [`Resources`] wraps exactly one [`Node`]. Handlers receive one as their
//! per-element input and may hand one back as output; the engine uses
//! another as the output tree it packs results into. All mutators work in
//! place and return `&mut Self` so calls can be chained.
//!
//! Copyright (c) 2025 Respack Team
//! Licensed under the Apache-2.0 license

use crate::node::{Deferred, Instruction, Node};
use crate::resource::Resource;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::VecDeque;

/// A thin mutable wrapper around one output tree value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resources {
    resources: Node,
}

impl Resources {
    pub fn new(resources: impl Into<Node>) -> Self {
        Self {
            resources: resources.into(),
        }
    }

    /// A container holding an empty mapping
    pub fn map() -> Self {
        Self::new(Node::map())
    }

    /// The owned value
    pub fn get(&self) -> &Node {
        &self.resources
    }

    pub fn get_mut(&mut self) -> &mut Node {
        &mut self.resources
    }

    pub fn into_inner(self) -> Node {
        self.resources
    }

    /// The owned value as JSON, unresolved deferred values becoming `null`
    pub fn to_value(&self) -> Value {
        self.resources.to_value()
    }

    pub fn into_value(self) -> Value {
        self.resources.into_value()
    }

    /// Builder-style insert of a top-level entry
    ///
    /// Turns the owned value into a mapping first if it is not one.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        ensure_map(&mut self.resources).insert(key.into(), value.into());
        self
    }

    /// Write `value` at a dot-separated path, creating intermediate mappings
    ///
    /// Any intermediate value that is not a mapping is replaced by one. An
    /// empty path replaces the whole owned value.
    pub fn deep_set(&mut self, value: impl Into<Node>, path: &str) -> &mut Self {
        let value = value.into();
        if path.is_empty() {
            self.resources = value;
            return self;
        }

        let (parents, last) = match path.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, path),
        };

        let mut current = &mut self.resources;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                current = ensure_map(current)
                    .entry(segment.to_string())
                    .or_insert_with(Node::map);
            }
        }
        ensure_map(current).insert(last.to_string(), value);

        self
    }

    /// Read the value at a dot-separated path
    pub fn deep_get(&self, path: &str) -> Option<&Node> {
        if path.is_empty() {
            return Some(&self.resources);
        }
        path.split('.')
            .try_fold(&self.resources, |node, segment| node.get(segment))
    }

    /// Shallow merge of `other` into the owned value
    ///
    /// Mappings merge key by key with `other` winning; lists are appended.
    /// Any other combination replaces the owned value with `other`.
    pub fn merge(&mut self, other: impl Into<Node>) -> &mut Self {
        let other: Node = other.into();
        match (&mut self.resources, other) {
            (Node::Map(mine), Node::Map(theirs)) => {
                for (key, value) in theirs {
                    mine.insert(key, value);
                }
            }
            (Node::List(mine), Node::List(theirs)) => mine.extend(theirs),
            (mine, other) => *mine = other,
        }
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.resources.get(key).is_some()
    }

    pub fn get_key(&self, key: &str) -> Option<&Node> {
        self.resources.get(key)
    }

    /// Set a top-level entry, turning the owned value into a mapping if needed
    pub fn set_key(&mut self, key: impl Into<String>, value: impl Into<Node>) -> &mut Self {
        ensure_map(&mut self.resources).insert(key.into(), value.into());
        self
    }

    /// Remove a top-level entry, keeping the order of the others
    pub fn remove_key(&mut self, key: &str) -> Option<Node> {
        self.resources
            .as_map_mut()
            .and_then(|map| map.shift_remove(key))
    }

    /// Move the entry at `from` to the key `to`, keeping its position
    ///
    /// An existing entry at `to` is replaced. Nothing happens when `from`
    /// is missing.
    pub fn rename_key(&mut self, from: &str, to: impl Into<String>) -> &mut Self {
        let to = to.into();
        let Some(map) = self.resources.as_map_mut() else {
            return self;
        };
        let Some((mut index, _, value)) = map.shift_remove_full(from) else {
            return self;
        };
        if let Some((existing, _, _)) = map.shift_remove_full(&to) {
            if existing < index {
                index -= 1;
            }
        }
        let at = index.min(map.len());
        map.shift_insert(at, to, value);
        self
    }

    /// Read a named field as JSON
    ///
    /// Accepts a dot path. Yields `null` when the field is missing or the
    /// owned value is not a mapping.
    pub fn attr(&self, name: &str) -> Value {
        self.deep_get(name)
            .map(Node::to_value)
            .unwrap_or(Value::Null)
    }

    /// Apply `f` once per element of a collection, or once to a single value
    ///
    /// Lists and paginated lists keep their shape; a paginated result keeps
    /// its metadata untouched.
    pub fn map_unit<F, E>(resource: &Resource, f: F) -> Result<Resource, E>
    where
        F: FnMut(&Value) -> Result<Value, E>,
    {
        resource.map(f)
    }

    /// Resolve every deferred entry of the owned mapping
    ///
    /// Entries are visited in order through a work queue seeded with the
    /// keys present when the pass starts. A deferred entry is called with
    /// this container and its key and the returned instructions are applied
    /// in order. Deferred values inserted by an instruction are visited
    /// right after the entry that inserted them; replacement values are
    /// never re-evaluated. Non-mapping values are left alone.
    pub fn map_exec_closure(&mut self) -> &mut Self {
        let mut queue: VecDeque<String> = match self.resources.as_map() {
            Some(map) => map.keys().cloned().collect(),
            None => return self,
        };

        while let Some(key) = queue.pop_front() {
            let deferred = match self.resources.get(&key) {
                Some(Node::Deferred(deferred)) => deferred.clone(),
                _ => continue,
            };

            let instructions = deferred.call(self, &key);
            tracing::trace!(key = %key, instructions = instructions.len(), "resolved deferred entry");

            let inserted = self.apply_instructions(&key, instructions);
            for inserted_key in inserted.into_iter().rev() {
                queue.push_front(inserted_key);
            }
        }

        self
    }

    /// Apply the edits of one deferred entry, returning deferred keys it inserted
    fn apply_instructions(&mut self, key: &str, instructions: Vec<Instruction>) -> Vec<String> {
        let mut inserted = Vec::new();
        let Some(map) = self.resources.as_map_mut() else {
            return inserted;
        };
        let Some(index) = map.get_index_of(key) else {
            return inserted;
        };
        let mut insert_at = index + 1;

        for instruction in instructions {
            match instruction {
                Instruction::Keep => {}
                Instruction::Replace(node) => {
                    if let Some(slot) = map.get_mut(key) {
                        *slot = node;
                    }
                }
                Instruction::Remove => {
                    if map.shift_remove(key).is_some() {
                        insert_at = map.len();
                    }
                }
                Instruction::InsertAfter(new_key, node) => {
                    if let Some((existing, _, _)) = map.shift_remove_full(&new_key) {
                        if existing < insert_at {
                            insert_at -= 1;
                        }
                    }
                    if node.is_deferred() {
                        inserted.push(new_key.clone());
                    }
                    let at = insert_at.min(map.len());
                    map.shift_insert(at, new_key, node);
                    insert_at = at + 1;
                }
            }
        }

        inserted
    }
}

/// Conditionally keep a field
///
/// When `condition` holds, `action` runs immediately and its result becomes
/// the field's value. Otherwise the field is a deferred value that removes
/// itself when the container is resolved with
/// [`Resources::map_exec_closure`].
pub fn when<F, R>(condition: bool, action: F) -> Node
where
    F: FnOnce() -> R,
    R: Into<Node>,
{
    if condition {
        action().into()
    } else {
        Node::Deferred(Deferred::remove())
    }
}

fn ensure_map(node: &mut Node) -> &mut IndexMap<String, Node> {
    if !matches!(node, Node::Map(_)) {
        *node = Node::map();
    }
    match node {
        Node::Map(map) => map,
        _ => unreachable!("node was just replaced by a mapping"),
    }
}

impl From<Node> for Resources {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

impl From<Value> for Resources {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<IndexMap<String, Node>> for Resources {
    fn from(map: IndexMap<String, Node>) -> Self {
        Self::new(map)
    }
}

impl From<Resources> for Node {
    fn from(resources: Resources) -> Self {
        resources.resources
    }
}

impl Serialize for Resources {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Paginator;
    use serde_json::json;

    #[test]
    fn test_deep_set_creates_intermediate_maps() {
        let mut resources = Resources::map();
        resources.deep_set("v", "a.b.c");

        assert_eq!(resources.deep_get("a.b.c"), Some(&Node::from("v")));
        let parent = resources.deep_get("a.b").and_then(Node::as_map).unwrap();
        assert!(parent.contains_key("c"));
        assert_eq!(resources.to_value(), json!({"a": {"b": {"c": "v"}}}));
    }

    #[test]
    fn test_deep_set_replaces_scalar_intermediate() {
        let mut resources = Resources::new(json!({"a": 1}));
        resources.deep_set(json!(2), "a.b");
        assert_eq!(resources.to_value(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_deep_set_keeps_siblings() {
        let mut resources = Resources::new(json!({"a": {"x": 1}}));
        resources
            .deep_set(json!(2), "a.y")
            .deep_set(json!(3), "b");
        assert_eq!(resources.to_value(), json!({"a": {"x": 1, "y": 2}, "b": 3}));
    }

    #[test]
    fn test_deep_set_empty_path_replaces_value() {
        let mut resources = Resources::new(json!({"a": 1}));
        resources.deep_set(json!([1, 2]), "");
        assert_eq!(resources.to_value(), json!([1, 2]));
    }

    #[test]
    fn test_merge_overwrites_matching_keys() {
        let mut resources = Resources::new(json!({"a": 1, "b": 2}));
        resources.merge(json!({"b": 3, "c": 4}));
        assert_eq!(resources.to_value(), json!({"a": 1, "b": 3, "c": 4}));

        let mut list = Resources::new(json!([1]));
        list.merge(json!([2, 3]));
        assert_eq!(list.to_value(), json!([1, 2, 3]));
    }

    #[test]
    fn test_key_access() {
        let mut resources = Resources::new(json!({"name": "Ann", "profile": {"age": 30}}));

        assert!(resources.contains_key("name"));
        assert_eq!(resources.attr("name"), json!("Ann"));
        assert_eq!(resources.attr("profile.age"), json!(30));
        assert_eq!(resources.attr("missing"), Value::Null);

        resources.set_key("email", "ann@example.com");
        assert_eq!(resources.remove_key("name"), Some(Node::from("Ann")));
        assert!(!resources.contains_key("name"));
        assert_eq!(
            resources.to_value(),
            json!({"profile": {"age": 30}, "email": "ann@example.com"})
        );

        assert_eq!(Resources::new(json!("scalar")).attr("name"), Value::Null);
    }

    #[test]
    fn test_rename_key_keeps_position() {
        let mut resources = Resources::new(json!({"success": true, "virtual_pack": [1], "meta": {}}));
        resources.rename_key("virtual_pack", "data");
        let keys: Vec<_> = resources.get().as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["success", "data", "meta"]);

        let mut clash = Resources::new(json!({"data": "old", "virtual_pack": "new"}));
        clash.rename_key("virtual_pack", "data");
        assert_eq!(clash.to_value(), json!({"data": "new"}));

        let mut missing = Resources::new(json!({"a": 1}));
        missing.rename_key("b", "c");
        assert_eq!(missing.to_value(), json!({"a": 1}));
    }

    #[test]
    fn test_map_unit_paginator_identity() {
        let paginator = Paginator::from_parts(vec![json!({"id": 1}), json!({"id": 2})], 3, 4, 2, 8);
        let resource = Resource::Paginated(paginator.clone());

        let mapped = Resources::map_unit(&resource, |v| Ok::<_, ()>(v.clone())).unwrap();
        let mapped = mapped.as_paginator().unwrap();

        assert_eq!(mapped.items(), paginator.items());
        assert_eq!(mapped.current_page(), 3);
        assert_eq!(mapped.last_page(), 4);
        assert_eq!(mapped.per_page(), 2);
        assert_eq!(mapped.total(), 8);
    }

    #[test]
    fn test_map_unit_scalar_list() {
        let resource = Resource::from(json!([1, 2, 3]));
        let mapped = Resources::map_unit(&resource, |v| {
            Ok::<_, ()>(json!(v.as_i64().unwrap_or_default() + 1))
        })
        .unwrap();
        assert_eq!(mapped.into_value(), json!([2, 3, 4]));
    }

    #[test]
    fn test_map_exec_closure_delete_and_insert() {
        let deferred = Deferred::new(|_, _| {
            vec![
                Instruction::Remove,
                Instruction::InsertAfter("k3".to_string(), Node::from("x")),
            ]
        });
        let mut resources = Resources::map()
            .with("k1", deferred)
            .with("k2", "plain");

        resources.map_exec_closure();

        assert_eq!(resources.to_value(), json!({"k2": "plain", "k3": "x"}));
        assert!(!resources.contains_key("k1"));
        assert_eq!(
            serde_json::to_string(&resources).unwrap(),
            r#"{"k2":"plain","k3":"x"}"#
        );
    }

    #[test]
    fn test_map_exec_closure_insert_keeps_position_until_removed() {
        let mut resources = Resources::map()
            .with("a", 1i64)
            .with(
                "b",
                Deferred::new(|_, _| {
                    vec![
                        Instruction::InsertAfter("b1".to_string(), Node::from(1i64)),
                        Instruction::Remove,
                        Instruction::InsertAfter("b2".to_string(), Node::from(2i64)),
                        Instruction::InsertAfter("b3".to_string(), Node::from(3i64)),
                    ]
                }),
            )
            .with("c", 3i64);

        resources.map_exec_closure();

        let keys: Vec<_> = resources.get().as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b1", "c", "b2", "b3"]);
    }

    #[test]
    fn test_map_exec_closure_when() {
        let mut resources = Resources::map()
            .with("name", "Ann")
            .with("secret", when(false, || "hidden"))
            .with("role", when(true, || "admin"));

        resources.map_exec_closure();

        assert_eq!(resources.to_value(), json!({"name": "Ann", "role": "admin"}));
    }

    #[test]
    fn test_map_exec_closure_replace_and_keep() {
        let mut resources = Resources::map()
            .with(
                "total",
                Deferred::new(|container, _| {
                    let sum = container.attr("a").as_i64().unwrap_or_default()
                        + container.attr("b").as_i64().unwrap_or_default();
                    vec![Instruction::Replace(Node::from(sum))]
                }),
            )
            .with("a", 1i64)
            .with("b", 2i64)
            .with("lazy", Deferred::new(|_, _| vec![Instruction::Keep]));

        resources.map_exec_closure();

        assert_eq!(resources.attr("total"), json!(3));
        assert!(resources.get_key("lazy").is_some_and(Node::is_deferred));
        assert_eq!(resources.to_value()["lazy"], Value::Null);
    }

    #[test]
    fn test_map_exec_closure_visits_inserted_deferred() {
        let mut resources = Resources::map().with(
            "first",
            Deferred::new(|_, key| {
                vec![
                    Instruction::Replace(Node::from(key)),
                    Instruction::InsertAfter(
                        "second".to_string(),
                        Node::Deferred(Deferred::new(|_, key| {
                            vec![Instruction::Replace(Node::from(format!("{}!", key)))]
                        })),
                    ),
                ]
            }),
        );
        resources.set_key("last", "end");

        resources.map_exec_closure();

        let keys: Vec<_> = resources.get().as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["first", "second", "last"]);
        assert_eq!(
            resources.to_value(),
            json!({"first": "first", "second": "second!", "last": "end"})
        );
    }

    #[test]
    fn test_map_exec_closure_replacement_not_reevaluated() {
        let mut resources = Resources::map().with(
            "self",
            Deferred::new(|_, _| vec![Instruction::Replace(Node::Deferred(Deferred::remove()))]),
        );

        resources.map_exec_closure();

        assert!(resources.get_key("self").is_some_and(Node::is_deferred));
    }

    #[test]
    fn test_map_exec_closure_ignores_non_map() {
        let mut resources = Resources::new(json!([1, 2]));
        resources.map_exec_closure();
        assert_eq!(resources.to_value(), json!([1, 2]));
    }

    #[test]
    fn test_serialize_resources() {
        let resources = Resources::map().with("a", 1i64).with("skip", when(false, || 2i64));
        let text = serde_json::to_string(&resources).unwrap();
        assert_eq!(text, r#"{"a":1,"skip":null}"#);
    }
}
