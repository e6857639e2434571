//! Output key declarations and the handler registry
//!
//! A transform declares, in order, which input resources it turns into
//! output, where each result is mounted in the output tree, and the handler
//! that shapes one element of that resource.
//!
//! Copyright (c) 2025 Respack Team
//! Licensed under the Apache-2.0 license

use crate::config::Config;
use crate::{Error, Resources, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Caller-supplied parameters, visible to every handler
pub type Parameters = Map<String, Value>;

/// Where a resolved resource is mounted in the output tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    /// Directly at the root of the packed data
    Root,
    /// Under a dot-separated path inside the packed data
    Named(String),
}

impl OutputTarget {
    /// The dot path for named targets
    pub fn path(&self) -> Option<&str> {
        match self {
            OutputTarget::Root => None,
            OutputTarget::Named(path) => Some(path),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, OutputTarget::Root)
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Root => write!(f, "<root>"),
            OutputTarget::Named(path) => write!(f, "{}", path),
        }
    }
}

impl From<&str> for OutputTarget {
    fn from(path: &str) -> Self {
        OutputTarget::Named(path.to_string())
    }
}

impl From<String> for OutputTarget {
    fn from(path: String) -> Self {
        OutputTarget::Named(path)
    }
}

/// What a handler can see besides the element it shapes
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    key: &'a str,
    parameters: &'a Parameters,
    config: &'a Config,
}

impl<'a> Context<'a> {
    pub(crate) fn new(key: &'a str, parameters: &'a Parameters, config: &'a Config) -> Self {
        Self {
            key,
            parameters,
            config,
        }
    }

    /// The lookup key of the resource being transformed
    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Wrap a failure raised inside a handler, tagging it with the current key
    pub fn error(&self, source: impl Into<anyhow::Error>) -> Error {
        Error::Handler {
            key: self.key.to_string(),
            source: source.into(),
        }
    }
}

/// A registered handler, shaping one element of a resource
pub type Handler<'a> = Box<dyn Fn(&Context<'_>, Resources) -> Result<Resources> + 'a>;

/// One declared entry: lookup key, mount point and handler
pub struct OutputKey<'a> {
    resource: String,
    target: OutputTarget,
    handler: Handler<'a>,
}

impl<'a> OutputKey<'a> {
    /// The key looked up in the input resource set
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub(crate) fn call(&self, context: &Context<'_>, element: Resources) -> Result<Resources> {
        (self.handler)(context, element)
    }
}

impl fmt::Debug for OutputKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputKey")
            .field("resource", &self.resource)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// The ordered output key declaration of a transform
#[derive(Debug, Default)]
pub struct Declaration<'a> {
    entries: Vec<OutputKey<'a>>,
}

impl<'a> Declaration<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource mounted under its own key name
    pub fn key<F, R>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> R + 'a,
        R: Into<Resources>,
    {
        let key = key.into();
        let target = OutputTarget::Named(key.clone());
        self.entry(key, target, move |ctx, element| Ok(handler(ctx, element)))
    }

    /// Declare a resource mounted under a dot path of its own choosing
    pub fn named<F, R>(&mut self, key: impl Into<String>, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> R + 'a,
        R: Into<Resources>,
    {
        self.entry(key, OutputTarget::Named(path.into()), move |ctx, element| {
            Ok(handler(ctx, element))
        })
    }

    /// Declare a resource mounted at the root of the packed data
    pub fn root<F, R>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> R + 'a,
        R: Into<Resources>,
    {
        self.entry(key, OutputTarget::Root, move |ctx, element| Ok(handler(ctx, element)))
    }

    /// Fallible variant of [`Declaration::key`]
    pub fn try_key<F, R>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> Result<R> + 'a,
        R: Into<Resources>,
    {
        let key = key.into();
        let target = OutputTarget::Named(key.clone());
        self.entry(key, target, handler)
    }

    /// Fallible variant of [`Declaration::named`]
    pub fn try_named<F, R>(
        &mut self,
        key: impl Into<String>,
        path: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> Result<R> + 'a,
        R: Into<Resources>,
    {
        self.entry(key, OutputTarget::Named(path.into()), handler)
    }

    /// Fallible variant of [`Declaration::root`]
    pub fn try_root<F, R>(&mut self, key: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> Result<R> + 'a,
        R: Into<Resources>,
    {
        self.entry(key, OutputTarget::Root, handler)
    }

    /// Declare an entry with an explicit target
    pub fn entry<F, R>(&mut self, key: impl Into<String>, target: OutputTarget, handler: F) -> &mut Self
    where
        F: Fn(&Context<'_>, Resources) -> Result<R> + 'a,
        R: Into<Resources>,
    {
        self.entries.push(OutputKey {
            resource: key.into(),
            target,
            handler: Box::new(move |ctx: &Context<'_>, element: Resources| -> Result<Resources> {
                handler(ctx, element).map(Into::into)
            }),
        });
        self
    }

    pub fn entries(&self) -> &[OutputKey<'a>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries mounted at the root
    pub fn root_count(&self) -> usize {
        self.entries.iter().filter(|e| e.target.is_root()).count()
    }

    /// Reject ambiguous declarations
    ///
    /// At most one entry may target the root, and every lookup key must map
    /// to exactly one handler.
    pub fn validate(&self) -> Result<()> {
        let count = self.root_count();
        if count > 1 {
            return Err(Error::MultipleRootKeys { count });
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.resource.as_str()) {
                return Err(Error::DuplicateKey {
                    key: entry.resource.clone(),
                });
            }
        }

        Ok(())
    }
}
