//! # SchemaTree
//!
//! JSON data wrapped in schema-bound trees. Every write through a
//! [`ValidatingNode`] is checked against the JSON Schema fragment bound to
//! that position, nested containers come back as nodes sharing the same
//! storage, and the composition keywords (`oneOf`, `anyOf`, `allOf`, `not`,
//! `if`/`then`/`else`, `contains`) are resolved against the live data.
//!
//! ```
//! use schematree::prelude::*;
//! use serde_json::json;
//!
//! let order = ValidatingNode::with_schema(
//!     json!({"id": 7}),
//!     &json!({
//!         "properties": {
//!             "id": {"type": "integer"},
//!             "status": {"type": "string", "default": "pending"}
//!         }
//!     }),
//! )?;
//!
//! assert_eq!(order.read("status")?.as_value(), Some(&json!("pending")));
//! assert!(order.write("id", json!("seven")).is_err());
//! # Ok::<(), schematree::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod domain;
pub mod error;
pub mod tree;

pub use config::ValidationConfig;
pub use domain::{
    DomainError, DomainResult, JsonPath, Keyword, PathSegment, SchemaError, SchemaNode,
    SchemaType, SchemaValidationError, SchemaValidationResult, TypeSet,
    services::{CompositionKind, CompositionService, Resolution, ValidationService},
};
pub use error::{Error, Result};
pub use tree::{CompositionOutcome, Entry, NodeShape, TreeSnapshot, TreeStore, ValidatingNode};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        CompositionKind, CompositionOutcome, Entry, Error, JsonPath, NodeShape, PathSegment,
        Result, SchemaNode, SchemaValidationError, TreeSnapshot, TreeStore, ValidatingNode,
        ValidationConfig,
    };
}
