//! Input resources handed to a transform
//!
//! A [`Resource`] is one unit of already-materialized application data: a
//! single scalar or record, a plain list, or a paginated list. The set of
//! resources passed to a transform is a [`ResourceSet`], keyed by the lookup
//! key each declared handler resolves.
//!
//! Copyright (c) 2025 Respack Team
//! Licensed under the Apache-2.0 license

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input resources keyed by lookup key, in insertion order
pub type ResourceSet = IndexMap<String, Resource>;

/// A unit of input data
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A single scalar value (null, bool, number or string)
    Scalar(Value),
    /// A single record
    Record(Map<String, Value>),
    /// A plain ordered collection
    List(Vec<Value>),
    /// A page of a larger collection, with its pagination metadata
    Paginated(Paginator),
}

impl Resource {
    /// Whether this resource is a paginated list
    pub fn is_paginated(&self) -> bool {
        matches!(self, Resource::Paginated(_))
    }

    /// The paginator, if this resource is one
    pub fn as_paginator(&self) -> Option<&Paginator> {
        match self {
            Resource::Paginated(paginator) => Some(paginator),
            _ => None,
        }
    }

    /// Whether this resource holds several elements that are mapped one by one
    pub fn is_collection(&self) -> bool {
        matches!(self, Resource::List(_) | Resource::Paginated(_))
    }

    /// Apply `f` to every element of a collection, or once to a single value
    ///
    /// The result keeps the shape of `self`: a paginated resource stays
    /// paginated with identical metadata, a list stays a list, and a single
    /// value is reclassified from whatever `f` returned.
    pub fn map<F, E>(&self, mut f: F) -> Result<Resource, E>
    where
        F: FnMut(&Value) -> Result<Value, E>,
    {
        match self {
            Resource::List(items) => items
                .iter()
                .map(&mut f)
                .collect::<Result<Vec<_>, E>>()
                .map(Resource::List),
            Resource::Paginated(paginator) => paginator.try_map(f).map(Resource::Paginated),
            Resource::Scalar(value) => f(value).map(Resource::from),
            Resource::Record(record) => {
                f(&Value::Object(record.clone())).map(Resource::from)
            }
        }
    }

    /// Convert into plain JSON, dropping pagination metadata
    pub fn into_value(self) -> Value {
        match self {
            Resource::Scalar(value) => value,
            Resource::Record(record) => Value::Object(record),
            Resource::List(items) => Value::Array(items),
            Resource::Paginated(paginator) => Value::Array(paginator.items),
        }
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Resource::List(items),
            Value::Object(record) => Resource::Record(record),
            other => Resource::Scalar(other),
        }
    }
}

impl From<Paginator> for Resource {
    fn from(paginator: Paginator) -> Self {
        Resource::Paginated(paginator)
    }
}

impl From<Vec<Value>> for Resource {
    fn from(items: Vec<Value>) -> Self {
        Resource::List(items)
    }
}

/// A page of items plus the metadata describing where it sits in the full set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginator {
    items: Vec<Value>,
    current_page: u64,
    last_page: u64,
    per_page: u64,
    total: u64,
}

impl Paginator {
    /// Create a length-aware paginator
    ///
    /// The last page is derived from `total` and `per_page` and is never
    /// less than 1. A current page of 0 is treated as page 1.
    pub fn new(items: Vec<Value>, total: u64, per_page: u64, current_page: u64) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };

        Self {
            items,
            current_page: current_page.max(1),
            last_page,
            per_page,
            total,
        }
    }

    /// Create a paginator with every metadata field given explicitly
    pub fn from_parts(
        items: Vec<Value>,
        current_page: u64,
        last_page: u64,
        per_page: u64,
        total: u64,
    ) -> Self {
        Self {
            items,
            current_page: current_page.max(1),
            last_page: last_page.max(1),
            per_page,
            total,
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn last_page(&self) -> u64 {
        self.last_page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Map every item, keeping the metadata
    pub fn map<F>(&self, f: F) -> Paginator
    where
        F: FnMut(&Value) -> Value,
    {
        Paginator {
            items: self.items.iter().map(f).collect(),
            ..self.without_items()
        }
    }

    /// Fallible variant of [`Paginator::map`]
    pub fn try_map<F, E>(&self, f: F) -> Result<Paginator, E>
    where
        F: FnMut(&Value) -> Result<Value, E>,
    {
        Ok(Paginator {
            items: self.items.iter().map(f).collect::<Result<Vec<_>, E>>()?,
            ..self.without_items()
        })
    }

    /// The metadata of this page, without its items
    pub(crate) fn without_items(&self) -> Paginator {
        Paginator {
            items: Vec::new(),
            current_page: self.current_page,
            last_page: self.last_page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
