//! Respack Core - resource-to-response transformation for API output shaping
//!
//! This crate turns already-materialized application data (single records,
//! collections, paginated sets) into a consistently shaped response tree.
//! A transform declares, per logical key, how each raw resource maps into
//! the output, and the engine packs the results together with pagination
//! metadata and configured additional data.
//!
//! # Main Components
//!
//! - **Resources**: mutable container with deep-path writes, merges and
//!   deferred value resolution
//! - **Resource**: the closed input type (scalar, record, list, paginator)
//! - **Transform**: the trait implementors declare output keys on, and the
//!   pipeline that runs it
//! - **Config**: pack names and additional data, loadable from files
//! - **Error Handling**: error types using `thiserror`
//!
//! # Example
//!
//! ```
//! use respack_core::{when, Declaration, Paginator, Parameters, Resources, Transform};
//! use serde_json::json;
//!
//! struct PostTransform;
//!
//! impl Transform for PostTransform {
//!     fn declare<'a>(&'a self, keys: &mut Declaration<'a>) {
//!         keys.key("posts", |_, post| {
//!             Resources::map()
//!                 .with("title", post.attr("title"))
//!                 .with("draft", when(post.attr("draft") == json!(true), || true))
//!         });
//!     }
//! }
//!
//! let posts = Paginator::new(vec![json!({ "title": "Hello", "draft": false })], 1, 15, 1);
//! let response = PostTransform.response([("posts", posts)], Parameters::new()).unwrap();
//!
//! assert_eq!(response.body["data"]["posts"], json!([{ "title": "Hello" }]));
//! assert_eq!(response.body["meta"]["posts"]["total"], json!(1));
//! ```

pub mod config;
pub mod declaration;
pub mod error;
pub mod node;
pub mod resource;
pub mod resources;
pub mod response;
pub mod transform;

// Re-export main types for convenience
pub use config::{Config, ConfigBuilder, PaginationInfo, VIRTUAL_PACK};
pub use declaration::{Context, Declaration, OutputKey, OutputTarget, Parameters};
pub use error::{Error, ErrorCategory, Result};
pub use node::{Deferred, Instruction, Node};
pub use resource::{Paginator, Resource, ResourceSet};
pub use resources::{when, Resources};
pub use response::{JsonResponse, JsonResponseBuilder, ResponseBuilder};
pub use transform::{Pipeline, Transform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
