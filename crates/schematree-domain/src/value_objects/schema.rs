//! Schema value object for JSON validation
//!
//! A [`SchemaNode`] is the parsed, immutable view of one schema fragment.
//! Leaf constraints are grouped into a closed set of [`Constraint`] families
//! built once by the parser, so validation never re-reads raw keywords.
//! Nested fragments are shared through `Arc`, which lets any number of tree
//! wrappers point at the same child schema.

use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::json_path::{JsonPath, PathSegment};
use super::keyword::{Keyword, SchemaType, TypeSet};
use super::schema_parser;

/// Compiled `pattern` / `patternProperties` regular expression
///
/// Matching is an unanchored search, as JSON Schema requires.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern
    ///
    /// # Errors
    /// Returns the regex compilation error for invalid syntax.
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    /// Pattern source text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericRules {
    /// Inclusive lower bound
    pub minimum: Option<f64>,
    /// Inclusive upper bound
    pub maximum: Option<f64>,
    /// Strict lower bound
    pub exclusive_minimum: Option<f64>,
    /// Strict upper bound
    pub exclusive_maximum: Option<f64>,
    /// Value must be an integer multiple of this (always > 0)
    pub multiple_of: Option<f64>,
}

/// `minLength`, `maxLength`, `pattern`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    /// Pattern searched anywhere in the string
    pub pattern: Option<Pattern>,
}

/// Element schemas declared by `items`
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// One schema applied to every element
    Single(Arc<SchemaNode>),
    /// Schemas applied index by index; extra elements are unconstrained
    Positional(Vec<Arc<SchemaNode>>),
}

impl Items {
    /// Schema governing the element at `index`
    pub fn schema_for(&self, index: usize) -> Option<&Arc<SchemaNode>> {
        match self {
            Self::Single(schema) => Some(schema),
            Self::Positional(schemas) => schemas.get(index),
        }
    }
}

/// `minItems`, `maxItems`, `uniqueItems`, `items`, `contains`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayRules {
    /// Minimum element count
    pub min_items: Option<usize>,
    /// Maximum element count
    pub max_items: Option<usize>,
    /// Whether all elements must be structurally distinct
    pub unique_items: bool,
    /// Element schemas
    pub items: Option<Items>,
    /// At least one element must satisfy this schema
    pub contains: Option<Arc<SchemaNode>>,
}

/// Non-`true` forms of `additionalProperties`
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    /// `false`: undeclared keys are rejected
    Forbidden,
    /// Undeclared keys must satisfy this schema
    Schema(Arc<SchemaNode>),
}

/// One entry of `dependencies`
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    /// Keys that must be present alongside the trigger key
    Required(Vec<String>),
    /// Schema the whole object must satisfy when the trigger key is present
    Schema(Arc<SchemaNode>),
}

/// Object constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRules {
    /// Named property schemas in declaration order
    pub properties: Vec<(String, Arc<SchemaNode>)>,
    /// Regex-keyed property schemas in declaration order
    pub pattern_properties: Vec<(Pattern, Arc<SchemaNode>)>,
    /// Treatment of keys matched by neither of the above
    pub additional_properties: Option<Additional>,
    /// Keys that must be present
    pub required: Vec<String>,
    /// Minimum key count
    pub min_properties: Option<usize>,
    /// Maximum key count
    pub max_properties: Option<usize>,
    /// Trigger key -> dependency
    pub dependencies: Vec<(String, Dependency)>,
}

impl ObjectRules {
    /// Schema declared under `properties` for `key`
    pub fn property(&self, key: &str) -> Option<&Arc<SchemaNode>> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, schema)| schema)
    }

    /// First `patternProperties` schema whose pattern matches `key`
    pub fn pattern_property(&self, key: &str) -> Option<&Arc<SchemaNode>> {
        self.pattern_properties
            .iter()
            .find(|(pattern, _)| pattern.is_match(key))
            .map(|(_, schema)| schema)
    }

    /// Whether `key` is covered by `properties` or `patternProperties`
    pub fn is_declared(&self, key: &str) -> bool {
        self.property(key).is_some() || self.pattern_property(key).is_some()
    }

    /// Schema a value stored under `key` is bound to
    ///
    /// Lookup order: `properties`, first matching `patternProperties`,
    /// then an `additionalProperties` schema.
    pub fn child_schema(&self, key: &str) -> Option<&Arc<SchemaNode>> {
        self.property(key)
            .or_else(|| self.pattern_property(key))
            .or(match &self.additional_properties {
                Some(Additional::Schema(schema)) => Some(schema),
                _ => None,
            })
    }

    /// Every schema a value stored under `key` must satisfy
    ///
    /// `properties` and all matching `patternProperties` apply together; the
    /// `additionalProperties` schema applies only when neither covers `key`.
    pub fn schemas_for(&self, key: &str) -> SmallVec<[&Arc<SchemaNode>; 2]> {
        let mut schemas: SmallVec<[&Arc<SchemaNode>; 2]> = self.property(key).into_iter().collect();
        schemas.extend(
            self.pattern_properties
                .iter()
                .filter(|(pattern, _)| pattern.is_match(key))
                .map(|(_, schema)| schema),
        );
        if schemas.is_empty()
            && let Some(Additional::Schema(schema)) = &self.additional_properties
        {
            schemas.push(schema);
        }
        schemas
    }
}

/// `enum` and `const`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralRules {
    /// Value must equal one member
    pub enum_values: Option<Vec<Value>>,
    /// Value must equal this literal
    pub const_value: Option<Value>,
}

/// Closed set of leaf constraint families
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `type`
    Type(TypeSet),
    /// Numeric bounds, applied to numbers only
    Numeric(NumericRules),
    /// String bounds, applied to strings only
    String(StringRules),
    /// Array bounds, applied to arrays only
    Array(ArrayRules),
    /// Object rules, applied to objects only
    Object(ObjectRules),
    /// `enum` / `const`
    Literal(LiteralRules),
    /// The boolean schema `false`
    Reject,
}

/// `if` / `then` / `else`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// Predicate schema
    pub if_schema: Arc<SchemaNode>,
    /// Applies when the predicate holds
    pub then_schema: Option<Arc<SchemaNode>>,
    /// Applies when the predicate fails
    pub else_schema: Option<Arc<SchemaNode>>,
}

/// Composition keywords of one fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionRules {
    /// `oneOf` branches
    pub one_of: Vec<Arc<SchemaNode>>,
    /// `anyOf` branches
    pub any_of: Vec<Arc<SchemaNode>>,
    /// `allOf` branches
    pub all_of: Vec<Arc<SchemaNode>>,
    /// `not`
    pub not: Option<Arc<SchemaNode>>,
    /// `if` / `then` / `else`; `then`/`else` without `if` are ignored
    pub conditional: Option<Conditional>,
}

impl CompositionRules {
    /// Whether no composition keyword is present
    pub fn is_empty(&self) -> bool {
        self.one_of.is_empty()
            && self.any_of.is_empty()
            && self.all_of.is_empty()
            && self.not.is_none()
            && self.conditional.is_none()
    }
}

/// Parsed, immutable view over one schema fragment
///
/// Built once by [`SchemaNode::parse`]; never mutated afterwards. Unknown
/// keywords are ignored.
///
/// # Examples
/// ```
/// # use schematree_domain::value_objects::SchemaNode;
/// # use serde_json::json;
/// let schema = SchemaNode::parse(&json!({
///     "type": "object",
///     "properties": {"age": {"type": "integer", "minimum": 0}}
/// }))
/// .unwrap();
///
/// assert!(schema.child_for_key("age").is_some());
/// assert!(schema.child_for_key("name").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(super) raw: Value,
    pub(super) constraints: SmallVec<[Constraint; 4]>,
    pub(super) default: Option<Value>,
    pub(super) composition: CompositionRules,
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl SchemaNode {
    /// Parse a schema document
    ///
    /// # Errors
    /// Returns `SchemaError` when a recognized keyword holds a malformed value
    /// (for example a composition keyword that does not hold schemas, or a
    /// pattern that does not compile).
    pub fn parse(raw: &Value) -> SchemaResult<Self> {
        schema_parser::parse_node(raw, "#")
    }

    /// Parse a schema document into a shareable node
    ///
    /// # Errors
    /// See [`SchemaNode::parse`].
    pub fn shared(raw: &Value) -> SchemaResult<Arc<Self>> {
        Self::parse(raw).map(Arc::new)
    }

    /// The unconstrained schema (`true`)
    pub fn any() -> Arc<Self> {
        static ANY: OnceLock<Arc<SchemaNode>> = OnceLock::new();
        Arc::clone(ANY.get_or_init(|| {
            Arc::new(Self {
                raw: Value::Bool(true),
                constraints: SmallVec::new(),
                default: None,
                composition: CompositionRules::default(),
            })
        }))
    }

    /// Raw schema document this node was parsed from
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Leaf constraint families in parse order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Composition keywords
    pub fn composition(&self) -> &CompositionRules {
        &self.composition
    }

    /// Whether any composition keyword is present
    pub fn has_composition(&self) -> bool {
        !self.composition.is_empty()
    }

    /// Whether the node imposes nothing at all
    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty() && self.composition.is_empty()
    }

    /// Whether this is the boolean schema `false`
    pub fn rejects_all(&self) -> bool {
        self.constraints.iter().any(|c| matches!(c, Constraint::Reject))
    }

    /// `default` value, if declared
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Allowed types, `None` when `type` is absent
    pub fn types(&self) -> Option<TypeSet> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Type(types) => Some(*types),
            _ => None,
        })
    }

    /// Numeric rules, if any numeric keyword is present
    pub fn numeric(&self) -> Option<&NumericRules> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Numeric(rules) => Some(rules),
            _ => None,
        })
    }

    /// String rules, if any string keyword is present
    pub fn string(&self) -> Option<&StringRules> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::String(rules) => Some(rules),
            _ => None,
        })
    }

    /// Array rules, if any array keyword is present
    pub fn array(&self) -> Option<&ArrayRules> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Array(rules) => Some(rules),
            _ => None,
        })
    }

    /// Object rules, if any object keyword is present
    pub fn object(&self) -> Option<&ObjectRules> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Object(rules) => Some(rules),
            _ => None,
        })
    }

    /// `enum` / `const`, if present
    pub fn literal(&self) -> Option<&LiteralRules> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Literal(rules) => Some(rules),
            _ => None,
        })
    }

    /// Child schema for an object member
    pub fn child_for_key(&self, key: &str) -> Option<&Arc<SchemaNode>> {
        self.object().and_then(|rules| rules.child_schema(key))
    }

    /// Child schema for an array element
    pub fn child_for_index(&self, index: usize) -> Option<&Arc<SchemaNode>> {
        self.array()
            .and_then(|rules| rules.items.as_ref())
            .and_then(|items| items.schema_for(index))
    }

    /// Child schema for any path segment
    pub fn child_for(&self, segment: &PathSegment) -> Option<&Arc<SchemaNode>> {
        match segment {
            PathSegment::Key(key) => self.child_for_key(key),
            PathSegment::Index(index) => self.child_for_index(*index),
        }
    }

    /// Every schema a value stored under `segment` must satisfy
    ///
    /// Unlike [`child_for`](Self::child_for), overlapping `properties` and
    /// `patternProperties` are all returned.
    pub fn schemas_for(&self, segment: &PathSegment) -> SmallVec<[&Arc<SchemaNode>; 2]> {
        match segment {
            PathSegment::Key(key) => self
                .object()
                .map(|rules| rules.schemas_for(key))
                .unwrap_or_default(),
            PathSegment::Index(index) => self.child_for_index(*index).into_iter().collect(),
        }
    }

    /// Declared `properties` that carry a `default`, in declaration order
    pub fn property_defaults(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.object()
            .into_iter()
            .flat_map(|rules| rules.properties.iter())
            .filter_map(|(name, schema)| {
                schema.default_value().map(|value| (name.as_str(), value))
            })
    }

    /// Raw document with the given top-level keywords removed
    ///
    /// Used to collect the sibling keywords around a composition keyword.
    pub fn raw_without(&self, keywords: &[&str]) -> Value {
        match &self.raw {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(name, _)| !keywords.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl TryFrom<&Value> for SchemaNode {
    type Error = SchemaError;

    fn try_from(raw: &Value) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

/// Schema parsing result
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Malformed schema document or unsatisfiable merge
///
/// Detected when a `SchemaNode` is built, never while validating data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Fragment is neither an object nor a boolean
    #[error("Invalid schema at '{pointer}': expected an object or boolean, got {found}")]
    NotASchema {
        /// JSON pointer of the fragment
        pointer: String,
        /// Type that was found instead
        found: String,
    },

    /// Recognized keyword with a malformed value
    #[error("Invalid schema at '{pointer}': '{keyword}' {message}")]
    InvalidKeyword {
        /// JSON pointer of the fragment
        pointer: String,
        /// Offending keyword
        keyword: Keyword,
        /// What is wrong with it
        message: String,
    },

    /// Regular expression that does not compile
    #[error("Invalid schema at '{pointer}': pattern '{pattern}' does not compile: {message}")]
    InvalidPattern {
        /// JSON pointer of the fragment
        pointer: String,
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Two merged fragments can never be satisfied together
    #[error("Cannot merge '{keyword}': {message}")]
    MergeConflict {
        /// Keyword whose declarations conflict
        keyword: Keyword,
        /// Description of the conflict
        message: String,
    },
}

/// Schema validation result
pub type SchemaValidationResult<T> = Result<T, SchemaValidationError>;

/// Why a composition keyword could not be resolved
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionFailureReason {
    /// No branch validated
    NoMatch,
    /// More than one `oneOf` branch validated
    MultipleMatches {
        /// Number of validating branches
        count: usize,
    },
    /// Merged `allOf` branches can never be satisfied together
    Unsatisfiable(String),
}

impl fmt::Display for CompositionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => f.write_str("no branch matched"),
            Self::MultipleMatches { count } => {
                write!(f, "expected exactly 1 matching branch, got {count}")
            }
            Self::Unsatisfiable(message) => write!(f, "unsatisfiable merge: {message}"),
        }
    }
}

/// Schema validation error with detailed context
///
/// Every variant carries the path of the failing value; the constraint
/// variants also carry the keyword and the offending value so a caller can
/// correct and retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaValidationError {
    /// Runtime type not among the declared types
    #[error("Type mismatch at '{path}': expected {expected}, got {actual} ({value})")]
    TypeMismatch {
        /// Path of the failing value
        path: JsonPath,
        /// Declared types
        expected: TypeSet,
        /// Runtime type found
        actual: SchemaType,
        /// Offending value
        value: Value,
    },

    /// Correct type but a bound/length/pattern/count/uniqueness/dependency/
    /// required/enum/const/not rule failed
    #[error("Constraint '{keyword}' violated at '{path}': {detail}")]
    ConstraintViolation {
        /// Path of the failing value
        path: JsonPath,
        /// Violated keyword
        keyword: Keyword,
        /// Offending value
        value: Value,
        /// Human-readable description
        detail: String,
    },

    /// `oneOf` / `anyOf` / `allOf` could not be resolved
    #[error("Composition '{keyword}' failed at '{path}': {reason}")]
    CompositionFailure {
        /// Path of the failing value
        path: JsonPath,
        /// Composition keyword
        keyword: Keyword,
        /// Failure reason
        reason: CompositionFailureReason,
    },

    /// Data nested deeper than the configured validation depth
    #[error("Validation depth exceeded at '{path}': maximum {max_depth}")]
    DepthExceeded {
        /// Path where the limit was hit
        path: JsonPath,
        /// Configured maximum
        max_depth: usize,
    },
}

impl SchemaValidationError {
    /// Create a constraint violation
    pub fn constraint(
        path: &JsonPath,
        keyword: Keyword,
        value: &Value,
        detail: impl Into<String>,
    ) -> Self {
        Self::ConstraintViolation {
            path: path.clone(),
            keyword,
            value: value.clone(),
            detail: detail.into(),
        }
    }

    /// Create a composition failure
    pub fn composition(path: &JsonPath, keyword: Keyword, reason: CompositionFailureReason) -> Self {
        Self::CompositionFailure {
            path: path.clone(),
            keyword,
            reason,
        }
    }

    /// Path of the failing value
    pub fn path(&self) -> &JsonPath {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::ConstraintViolation { path, .. }
            | Self::CompositionFailure { path, .. }
            | Self::DepthExceeded { path, .. } => path,
        }
    }

    /// Keyword that failed
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Self::TypeMismatch { .. } => Some(Keyword::Type),
            Self::ConstraintViolation { keyword, .. } | Self::CompositionFailure { keyword, .. } => {
                Some(*keyword)
            }
            Self::DepthExceeded { .. } => None,
        }
    }

    /// Offending value, when the variant carries one
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::TypeMismatch { value, .. } | Self::ConstraintViolation { value, .. } => Some(value),
            _ => None,
        }
    }
}
