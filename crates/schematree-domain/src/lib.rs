//! SchemaTree Domain Layer - Schema Value Objects
//!
//! This crate contains the pure, immutable part of SchemaTree: the parsed
//! view of a JSON Schema document ([`SchemaNode`]), the value objects used to
//! address positions inside a data tree ([`JsonPath`]) and the error taxonomy
//! shared by the validation engine.
//!
//! ## Architecture
//!
//! - **Value Objects**: immutable schema fragments, keywords, type sets, paths
//! - **Merge rules**: the `allOf` schema merge used by composition resolution
//! - **Errors**: validation failures and malformed-schema failures
//!
//! Nothing in this crate mutates data; the mutable tree lives in the
//! `schematree` crate.

#![warn(missing_docs)]

pub mod value_objects;

pub use value_objects::{
    Additional, ArrayRules, CompositionFailureReason, CompositionRules, Conditional, Constraint,
    Dependency, Items, JsonPath, Keyword, LiteralRules, NumericRules, ObjectRules, PathSegment,
    Pattern, SchemaError, SchemaNode, SchemaResult, SchemaType, SchemaValidationError,
    SchemaValidationResult, StringRules, TypeSet, merge_schemas, values_equal,
};

/// Domain Result type
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-specific errors
///
/// Errors raised by value-object constructors. Validation and schema
/// failures have their own dedicated types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum DomainError {
    /// Invalid JSON path format
    #[error("Invalid JSON path: {0}")]
    InvalidPath(String),
}

impl DomainError {
    /// Create an invalid path error
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }
}
