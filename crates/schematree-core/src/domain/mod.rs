//! Domain layer - validation and composition logic
//!
//! Re-exports the schema value objects of `schematree-domain` and holds the
//! domain services that evaluate them against data. Nothing here touches
//! tree storage.

pub mod services;

pub use schematree_domain::{
    DomainError, DomainResult, JsonPath, Keyword, PathSegment, SchemaError, SchemaNode,
    SchemaType, SchemaValidationError, SchemaValidationResult, TypeSet, value_objects,
};
