//! Domain Value Objects
//!
//! Immutable objects that represent concepts in the domain
//! with no conceptual identity, only defined by their attributes.

mod equality;
mod json_path;
mod keyword;
mod merge;
mod schema;
mod schema_parser;

pub use equality::values_equal;
pub use json_path::{JsonPath, PathSegment};
pub use keyword::{Keyword, SchemaType, TypeSet};
pub use merge::merge_schemas;
pub use schema::{
    Additional, ArrayRules, CompositionFailureReason, CompositionRules, Conditional, Constraint,
    Dependency, Items, LiteralRules, NumericRules, ObjectRules, Pattern, SchemaError, SchemaNode,
    SchemaResult, SchemaValidationError, SchemaValidationResult, StringRules,
};
