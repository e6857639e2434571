//! Transform orchestration
//!
//! A [`Transform`] declares its output keys and handlers; a [`Pipeline`]
//! runs one invocation of it through the stages:
//!
//! 1. validate the declaration, the configuration and the input shape
//! 2. merge the configured additional data into the output tree
//! 3. resolve every declared key through its handler and pack the result
//!    (plus pagination metadata) under the scratch root
//! 4. rename the scratch root to the configured pack name
//!
//! `quote` stops after stage 3 and returns the scratch subtree, so one
//! transform's output can be embedded in another's handler.
//!
//! Copyright (c) 2025 Respack Team
//! Licensed under the Apache-2.0 license

use crate::config::{Config, VIRTUAL_PACK};
use crate::declaration::{Context, Declaration, OutputKey, OutputTarget, Parameters};
use crate::node::Node;
use crate::resource::{Paginator, Resource, ResourceSet};
use crate::response::{JsonResponse, JsonResponseBuilder, ResponseBuilder};
use crate::{Error, Resources, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A resource-to-response transformation
///
/// Implementors register one handler per output key in
/// [`Transform::declare`]; the provided methods run the pipeline.
///
/// ```
/// use respack_core::{Declaration, Transform, Parameters, Resource};
/// use serde_json::json;
///
/// struct UserTransform;
///
/// impl Transform for UserTransform {
///     fn declare<'a>(&'a self, keys: &mut Declaration<'a>) {
///         keys.root("user", |_, user| json!({ "displayName": user.attr("name") }));
///     }
/// }
///
/// let response = UserTransform
///     .response([("user", Resource::from(json!({ "name": "Ann" })))], Parameters::new())
///     .unwrap();
/// assert_eq!(response.body, json!({ "data": { "displayName": "Ann" } }));
/// ```
pub trait Transform {
    /// Register the output keys of this transform, in order
    fn declare<'a>(&'a self, keys: &mut Declaration<'a>);

    /// Configuration used for packing
    fn config(&self) -> Cow<'_, Config> {
        Cow::Owned(Config::default())
    }

    /// Whether paginated resources get a pagination metadata block
    fn with_pagination_output(&self) -> bool {
        true
    }

    /// Build the declaration registered by [`Transform::declare`]
    fn declaration(&self) -> Declaration<'_> {
        let mut keys = Declaration::new();
        self.declare(&mut keys);
        keys
    }

    /// Run the full pipeline and build a JSON response
    fn response<I, K, R>(&self, resources: I, parameters: Parameters) -> Result<JsonResponse>
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Resource>,
    {
        self.response_with(&JsonResponseBuilder::default(), resources, parameters)
    }

    /// Run the full pipeline and hand the tree to `builder`
    fn response_with<B, I, K, R>(
        &self,
        builder: &B,
        resources: I,
        parameters: Parameters,
    ) -> Result<B::Output>
    where
        B: ResponseBuilder,
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Resource>,
    {
        let tree = Pipeline::new(self, collect_resources(resources), parameters).run()?;
        builder.build(tree)
    }

    /// Resolve and pack the declared keys, returning the packed data only
    ///
    /// No additional data is merged and no pack rename happens.
    fn quote<I, K, R>(&self, resources: I, parameters: Parameters) -> Result<Value>
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Resource>,
    {
        Pipeline::new(self, collect_resources(resources), parameters).quote()
    }
}

fn collect_resources<I, K, R>(resources: I) -> ResourceSet
where
    I: IntoIterator<Item = (K, R)>,
    K: Into<String>,
    R: Into<Resource>,
{
    resources
        .into_iter()
        .map(|(key, resource)| (key.into(), resource.into()))
        .collect()
}

/// One invocation of a transform
///
/// Owns the input resources and the output tree for the duration of a
/// single `response`/`quote` call.
pub struct Pipeline<'t, T: Transform + ?Sized> {
    transform: &'t T,
    config: Config,
    resources: ResourceSet,
    parameters: Parameters,
    output: Resources,
}

impl<'t, T: Transform + ?Sized> Pipeline<'t, T> {
    pub fn new(transform: &'t T, resources: ResourceSet, parameters: Parameters) -> Self {
        Self {
            transform,
            config: transform.config().into_owned(),
            resources,
            parameters,
            output: Resources::map(),
        }
    }

    /// Run every stage and return the finished output tree
    pub fn run(mut self) -> Result<Value> {
        let transform = self.transform;
        let declaration = transform.declaration();

        self.validate(&declaration)?;
        self.add_additional();
        self.transform_keys(&declaration)?;
        self.pack_data();

        tracing::debug!(pack = %self.config.pack, "transform packed");
        Ok(self.output.into_value())
    }

    /// Run validation and per-key packing, returning the scratch subtree
    pub fn quote(mut self) -> Result<Value> {
        let transform = self.transform;
        let declaration = transform.declaration();

        self.validate(&declaration)?;
        self.transform_keys(&declaration)?;

        Ok(self
            .output
            .remove_key(VIRTUAL_PACK)
            .map(Node::into_value)
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    fn validate(&self, declaration: &Declaration<'_>) -> Result<()> {
        self.config.validate()?;
        declaration.validate()?;

        let count = self.resources.values().filter(|r| r.is_paginated()).count();
        if count > 1 {
            return Err(Error::MultiplePaginators { count });
        }

        tracing::debug!(
            keys = declaration.len(),
            resources = self.resources.len(),
            "transform validated"
        );
        Ok(())
    }

    fn add_additional(&mut self) {
        let additional = &self.config.additional;
        for key in [&self.config.pack, &self.config.pagination_pack] {
            if additional.contains_key(key.as_str()) {
                tracing::warn!(key = %key, "additional data key is overwritten by packed output");
            }
        }
        self.output.merge(Value::Object(additional.clone()));
    }

    fn transform_keys(&mut self, declaration: &Declaration<'_>) -> Result<()> {
        let with_pagination = self.transform.with_pagination_output();

        for entry in declaration.entries() {
            let (data, paginator) = self.each_resource(entry)?;

            self.pack_output_key(entry.target(), data);
            if let Some(paginator) = paginator.filter(|_| with_pagination) {
                self.pack_pagination(entry.target(), &paginator);
            }
        }

        Ok(())
    }

    /// Resolve one declared key, returning its data and its paginator, if any
    fn each_resource(&self, entry: &OutputKey<'_>) -> Result<(Value, Option<Paginator>)> {
        let key = entry.resource();
        let resource = self
            .resources
            .get(key)
            .ok_or_else(|| Error::ResourceNotFound {
                key: key.to_string(),
            })?;

        tracing::debug!(
            key = %key,
            target = %entry.target(),
            collection = resource.is_collection(),
            "resolving resource"
        );

        let context = Context::new(key, &self.parameters, &self.config);
        let mapped = Resources::map_unit(resource, |element| {
            let mut output = entry.call(&context, Resources::new(element.clone()))?;
            output.map_exec_closure();
            Ok::<_, Error>(output.into_value())
        })?;

        let paginator = resource.as_paginator().map(Paginator::without_items);
        Ok((mapped.into_value(), paginator))
    }

    fn pack_output_key(&mut self, target: &OutputTarget, data: Value) {
        match target.path() {
            Some(path) => {
                self.output
                    .deep_set(data, &format!("{}.{}", VIRTUAL_PACK, path));
            }
            None => {
                let data = Node::from(data);
                let mut scratch = Resources::new(
                    self.output.remove_key(VIRTUAL_PACK).unwrap_or_else(Node::map),
                );
                if scratch.get().as_map().is_some() && data.as_map().is_some() {
                    scratch.merge(data);
                } else {
                    scratch.deep_set(data, "");
                }
                self.output.set_key(VIRTUAL_PACK, scratch);
            }
        }
    }

    fn pack_pagination(&mut self, target: &OutputTarget, paginator: &Paginator) {
        let info = &self.config.pagination_info;
        let block: IndexMap<String, Node> = [
            (info.current_page.clone(), Node::from(paginator.current_page())),
            (info.last_page.clone(), Node::from(paginator.last_page())),
            (info.per_page.clone(), Node::from(paginator.per_page())),
            (info.total.clone(), Node::from(paginator.total())),
        ]
        .into_iter()
        .collect();

        let path = match target.path() {
            Some(path) => format!("{}.{}", self.config.pagination_pack, path),
            None => self.config.pagination_pack.clone(),
        };
        self.output.deep_set(block, &path);
    }

    fn pack_data(&mut self) {
        if !self.output.contains_key(VIRTUAL_PACK) {
            self.output.set_key(VIRTUAL_PACK, Node::map());
        }
        self.output.rename_key(VIRTUAL_PACK, self.config.pack.clone());
    }
}
