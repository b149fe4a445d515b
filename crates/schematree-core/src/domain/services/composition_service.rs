//! Composition resolution domain service
//!
//! Resolves `oneOf` / `anyOf` / `allOf` / `not` / `if`-`then`-`else` /
//! `contains` against a concrete value. Resolution only reads: it returns
//! schemas to rebind to (or a predicate), and the tree layer wraps them.
//! Nothing is cached; every call re-evaluates the value it is given.

use schematree_domain::{
    CompositionFailureReason, JsonPath, Keyword, SchemaError, SchemaNode, SchemaValidationError,
    SchemaValidationResult, merge_schemas,
};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

use super::ValidationService;

/// Composition keyword handled by [`CompositionService::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    /// Exactly one branch
    OneOf,
    /// Every matching branch
    AnyOf,
    /// Merge of all branches
    AllOf,
    /// Negated predicate
    Not,
    /// Conditional branch selection
    IfThenElse,
    /// Some sequence element matches
    Contains,
}

impl CompositionKind {
    /// Every kind, in dispatch order
    pub const ALL: [CompositionKind; 6] = [
        Self::OneOf,
        Self::AnyOf,
        Self::AllOf,
        Self::Not,
        Self::IfThenElse,
        Self::Contains,
    ];

    /// Schema keyword driving this kind
    pub fn keyword(&self) -> Keyword {
        match self {
            Self::OneOf => Keyword::OneOf,
            Self::AnyOf => Keyword::AnyOf,
            Self::AllOf => Keyword::AllOf,
            Self::Not => Keyword::Not,
            Self::IfThenElse => Keyword::If,
            Self::Contains => Keyword::Contains,
        }
    }

    /// Whether the kind answers with a boolean rather than a schema
    pub fn is_predicate(&self) -> bool {
        matches!(self, Self::Not | Self::Contains)
    }
}

/// Outcome of resolving one composition keyword
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Keyword absent; the caller keeps its own binding
    Unchanged,
    /// Single schema to rebind to (`oneOf`, `allOf`, `if`)
    Rebound(Arc<SchemaNode>),
    /// Matching branches in declaration order (`anyOf`)
    Branches(Vec<Arc<SchemaNode>>),
    /// Predicate answer (`not`, `contains`)
    Predicate(bool),
}

/// Composition resolution service
///
/// # Examples
/// ```
/// # use schematree::domain::services::{CompositionKind, CompositionService, Resolution};
/// # use schematree_domain::{JsonPath, SchemaNode};
/// # use serde_json::json;
/// let service = CompositionService::default();
/// let schema = SchemaNode::shared(&json!({
///     "anyOf": [{"type": "integer"}, {"type": "number"}]
/// }))
/// .unwrap();
///
/// let resolution = service
///     .resolve(CompositionKind::AnyOf, &json!(42), Some(&schema), None, &JsonPath::root())
///     .unwrap();
/// assert!(matches!(resolution, Resolution::Branches(ref b) if b.len() == 2));
/// ```
#[derive(Debug, Clone)]
pub struct CompositionService {
    validator: Arc<ValidationService>,
}

impl CompositionService {
    /// Create a composition service over a validator
    pub fn new(validator: Arc<ValidationService>) -> Self {
        Self { validator }
    }

    /// Validator used to test branches
    pub fn validator(&self) -> &Arc<ValidationService> {
        &self.validator
    }

    /// Resolve one composition keyword against `data`
    ///
    /// `schema` is the bound schema (`None` for an unbound node). `explicit`
    /// overrides the declared schema for the predicate kinds.
    ///
    /// # Errors
    /// `oneOf` with zero or several matches, `anyOf` with no match and an
    /// unsatisfiable `allOf` merge fail with `CompositionFailure`; `allOf`
    /// also reports the data's violation of the merged schema.
    pub fn resolve(
        &self,
        kind: CompositionKind,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        explicit: Option<&SchemaNode>,
        path: &JsonPath,
    ) -> SchemaValidationResult<Resolution> {
        let resolution = match kind {
            CompositionKind::OneOf => self.one_of(data, schema, path)?,
            CompositionKind::AnyOf => self.any_of(data, schema, path)?,
            CompositionKind::AllOf => self.all_of(data, schema, path)?,
            CompositionKind::Not => Resolution::Predicate(self.not_of(data, schema, explicit)),
            CompositionKind::IfThenElse => self.if_then(data, schema),
            CompositionKind::Contains => {
                Resolution::Predicate(self.contains(data, schema, explicit))
            }
        };
        trace!(%path, ?kind, outcome = resolution.label(), "resolved composition");
        Ok(resolution)
    }

    fn one_of(
        &self,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        path: &JsonPath,
    ) -> SchemaValidationResult<Resolution> {
        let Some(schema) = schema.filter(|s| !s.composition().one_of.is_empty()) else {
            return Ok(Resolution::Unchanged);
        };
        let branches = &schema.composition().one_of;
        let matches = self.matching_branches(data, branches);
        match matches.as_slice() {
            [index] => {
                let branch = &branches[*index];
                with_siblings(schema, Keyword::OneOf, branch)
                    .map(Resolution::Rebound)
                    .map_err(|e| unsatisfiable(path, Keyword::OneOf, e))
            }
            [] => Err(SchemaValidationError::composition(
                path,
                Keyword::OneOf,
                CompositionFailureReason::NoMatch,
            )),
            several => Err(SchemaValidationError::composition(
                path,
                Keyword::OneOf,
                CompositionFailureReason::MultipleMatches {
                    count: several.len(),
                },
            )),
        }
    }

    fn any_of(
        &self,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        path: &JsonPath,
    ) -> SchemaValidationResult<Resolution> {
        let Some(schema) = schema.filter(|s| !s.composition().any_of.is_empty()) else {
            return Ok(Resolution::Unchanged);
        };
        let branches = &schema.composition().any_of;
        let matches = self.matching_branches(data, branches);
        if matches.is_empty() {
            return Err(SchemaValidationError::composition(
                path,
                Keyword::AnyOf,
                CompositionFailureReason::NoMatch,
            ));
        }
        Ok(Resolution::Branches(
            matches.into_iter().map(|i| Arc::clone(&branches[i])).collect(),
        ))
    }

    fn all_of(
        &self,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        path: &JsonPath,
    ) -> SchemaValidationResult<Resolution> {
        let Some(schema) = schema.filter(|s| !s.composition().all_of.is_empty()) else {
            return Ok(Resolution::Unchanged);
        };
        let merged = schema
            .effective()
            .map_err(|e| unsatisfiable(path, Keyword::AllOf, e))?;
        self.validator.validate(data, &merged, path)?;
        Ok(Resolution::Rebound(merged))
    }

    fn not_of(
        &self,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        explicit: Option<&SchemaNode>,
    ) -> bool {
        let target = explicit.or_else(|| schema.and_then(|s| s.composition().not.as_deref()));
        match target {
            Some(target) => !self.validator.is_valid(data, target),
            None => true,
        }
    }

    fn if_then(&self, data: &Value, schema: Option<&Arc<SchemaNode>>) -> Resolution {
        let Some(conditional) = schema.and_then(|s| s.composition().conditional.as_ref()) else {
            return Resolution::Unchanged;
        };
        let branch = if self.validator.is_valid(data, &conditional.if_schema) {
            &conditional.then_schema
        } else {
            &conditional.else_schema
        };
        Resolution::Rebound(branch.clone().unwrap_or_else(SchemaNode::any))
    }

    fn contains(
        &self,
        data: &Value,
        schema: Option<&Arc<SchemaNode>>,
        explicit: Option<&SchemaNode>,
    ) -> bool {
        let declared = schema.and_then(|s| s.array()).and_then(|rules| rules.contains.as_deref());
        let (Some(target), Value::Array(items)) = (explicit.or(declared), data) else {
            return false;
        };
        items.iter().any(|item| self.validator.is_valid(item, target))
    }

    /// Keep only the keys the schema declares, recursively
    ///
    /// A unique `oneOf` / `anyOf` match and the `allOf` merge are resolved
    /// first. Levels whose schema declares neither `properties` nor
    /// `patternProperties` are kept unchanged. Never fails.
    pub fn project(&self, data: &Value, schema: &Arc<SchemaNode>) -> Value {
        let resolved = self.projection_schema(data, schema);
        match data {
            Value::Object(object) => {
                let Some(rules) = resolved
                    .object()
                    .filter(|r| !r.properties.is_empty() || !r.pattern_properties.is_empty())
                else {
                    return data.clone();
                };
                let projected: Map<String, Value> = object
                    .iter()
                    .filter_map(|(key, value)| {
                        let child = rules.property(key).or_else(|| rules.pattern_property(key))?;
                        Some((key.clone(), self.project(value, child)))
                    })
                    .collect();
                Value::Object(projected)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match resolved.child_for_index(i) {
                        Some(child) => self.project(item, child),
                        None => item.clone(),
                    })
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    fn projection_schema(&self, data: &Value, schema: &Arc<SchemaNode>) -> Arc<SchemaNode> {
        let base = schema.effective().unwrap_or_else(|_| Arc::clone(schema));
        for keyword in [Keyword::OneOf, Keyword::AnyOf] {
            let branches = match keyword {
                Keyword::OneOf => &base.composition().one_of,
                _ => &base.composition().any_of,
            };
            if branches.is_empty() {
                continue;
            }
            if let [index] = self.matching_branches(data, branches).as_slice() {
                return with_siblings(&base, keyword, &branches[*index])
                    .unwrap_or_else(|_| Arc::clone(&branches[*index]));
            }
            break;
        }
        base
    }

    fn matching_branches(&self, data: &Value, branches: &[Arc<SchemaNode>]) -> SmallVec<[usize; 4]> {
        branches
            .iter()
            .enumerate()
            .filter(|(_, branch)| self.validator.is_valid(data, branch))
            .map(|(i, _)| i)
            .collect()
    }
}

impl Default for CompositionService {
    fn default() -> Self {
        Self::new(Arc::new(ValidationService::new()))
    }
}

impl Resolution {
    fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Rebound(_) => "rebound",
            Self::Branches(_) => "branches",
            Self::Predicate(true) => "true",
            Self::Predicate(false) => "false",
        }
    }
}

/// `branch` merged with every keyword of `parent` other than `keyword`
fn with_siblings(
    parent: &SchemaNode,
    keyword: Keyword,
    branch: &Arc<SchemaNode>,
) -> Result<Arc<SchemaNode>, SchemaError> {
    let siblings = parent.raw_without(&[keyword.as_str()]);
    if siblings.as_object().is_none_or(|map| map.is_empty()) {
        return Ok(Arc::clone(branch));
    }
    SchemaNode::shared(&merge_schemas(&[&siblings, branch.raw()])?)
}

fn unsatisfiable(path: &JsonPath, keyword: Keyword, err: SchemaError) -> SchemaValidationError {
    SchemaValidationError::composition(
        path,
        keyword,
        CompositionFailureReason::Unsatisfiable(err.to_string()),
    )
}
