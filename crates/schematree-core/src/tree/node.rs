//! Schema-bound view over one position of a shared tree

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

use super::defaults::{self, default_for, fill_defaults};
use super::slots::{NodeShape, slots, slots_mut};
use super::store::TreeStore;
use crate::domain::services::{CompositionKind, Resolution};
use crate::domain::value_objects::Additional;
use crate::domain::{
    JsonPath, Keyword, PathSegment, SchemaNode, SchemaType, SchemaValidationError,
    SchemaValidationResult,
};
use crate::error::{Error, Result};

/// Schema-bound handle to one value of a shared tree
///
/// A node is a store handle, a path into the store and an optional bound
/// schema. Navigation returns new nodes over the same store, so writes
/// through any of them are visible through all of them. The binding never
/// changes; composition methods return new nodes instead.
///
/// Every write through a bound node is validated before it is committed. A
/// rejected write leaves storage untouched. Unbound nodes accept every write.
///
/// # Examples
/// ```
/// # use schematree::prelude::*;
/// # use serde_json::json;
/// let schema = SchemaNode::shared(&json!({
///     "properties": {"age": {"type": "integer", "minimum": 0}}
/// }))?;
/// let person = ValidatingNode::from_value(json!({}), Some(schema));
///
/// person.write("age", json!(30))?;
/// assert!(person.write("age", json!("thirty")).is_err());
/// assert_eq!(person.to_value()?, json!({"age": 30}));
/// # Ok::<(), schematree::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ValidatingNode {
    store: TreeStore,
    path: JsonPath,
    schema: Option<Arc<SchemaNode>>,
    effective: Option<Arc<SchemaNode>>,
}

/// Result of reading one child
#[derive(Debug, Clone)]
pub enum Entry {
    /// Mapping or sequence child, wrapped over the same storage
    Node(ValidatingNode),
    /// Scalar child (or a default that is not stored)
    Value(Value),
}

impl Entry {
    /// The wrapped node, if the child is a container
    pub fn into_node(self) -> Option<ValidatingNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Value(_) => None,
        }
    }

    /// The scalar, if the child is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// Plain value of the child
    ///
    /// # Errors
    /// Returns `DanglingPath` if a wrapped child no longer resolves.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Self::Node(node) => node.to_value(),
            Self::Value(value) => Ok(value),
        }
    }
}

/// Node-level result of a composition keyword
#[derive(Debug, Clone)]
pub enum CompositionOutcome {
    /// `oneOf` or `if`/`then`/`else`
    Selected(ValidatingNode),
    /// `anyOf`, declaration order
    Branches(Vec<ValidatingNode>),
    /// `allOf`
    Merged(ValidatingNode),
    /// `not` or `contains`
    Predicate(bool),
}

enum Lookup {
    Container,
    Scalar(Value),
    Missing { shape: NodeShape, len: usize },
}

impl ValidatingNode {
    /// Wrap the root of a store
    ///
    /// Declared defaults missing from the data are filled in first.
    pub fn new(store: TreeStore, schema: Option<Arc<SchemaNode>>) -> Self {
        Self::attach(store, JsonPath::root(), schema, true)
    }

    /// Wrap a value in a new store with default configuration
    pub fn from_value(value: Value, schema: Option<Arc<SchemaNode>>) -> Self {
        Self::new(TreeStore::new(value), schema)
    }

    /// Parse `schema` and wrap `value` in a new store
    ///
    /// # Errors
    /// Returns `Error::Schema` for a malformed schema document.
    pub fn with_schema(value: Value, schema: &Value) -> Result<Self> {
        Ok(Self::from_value(value, Some(SchemaNode::shared(schema)?)))
    }

    /// Wrap a value with no schema; every write is accepted
    pub fn unbound(value: Value) -> Self {
        Self::from_value(value, None)
    }

    fn attach(
        store: TreeStore,
        path: JsonPath,
        schema: Option<Arc<SchemaNode>>,
        fill: bool,
    ) -> Self {
        let effective = schema.as_ref().map(defaults::effective);
        if fill
            && store.config().fill_defaults
            && let Some(schema) = &schema
        {
            store.write(|root| {
                if let Some(value) = path.resolve_mut(root) {
                    fill_defaults(value, schema, &path);
                }
            });
        }
        Self {
            store,
            path,
            schema,
            effective,
        }
    }

    fn attach_child(&self, segment: PathSegment) -> Self {
        let schema = self.child_schema(&segment);
        Self::attach(self.store.clone(), self.path.append(segment), schema, true)
    }

    fn rebind(&self, schema: Arc<SchemaNode>) -> Self {
        Self::attach(self.store.clone(), self.path.clone(), Some(schema), false)
    }

    /// Storage handle shared with every alias
    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    /// Location of this node in its store
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Bound schema
    pub fn schema(&self) -> Option<&Arc<SchemaNode>> {
        self.schema.as_ref()
    }

    /// Bound schema with its `allOf` folded in
    pub fn effective_schema(&self) -> Option<&Arc<SchemaNode>> {
        self.effective.as_ref()
    }

    /// Whether writes are validated
    pub fn is_bound(&self) -> bool {
        self.schema.is_some()
    }

    /// Shape of the current value
    ///
    /// # Errors
    /// Returns `DanglingPath` if the node no longer resolves.
    pub fn shape(&self) -> Result<NodeShape> {
        self.store.read(|root| {
            self.path
                .resolve(root)
                .map(NodeShape::of)
                .ok_or_else(|| Error::DanglingPath(self.path.clone()))
        })
    }

    /// Schema a child stored under `segment` is bound to
    pub fn child_schema(&self, segment: &PathSegment) -> Option<Arc<SchemaNode>> {
        self.effective
            .as_ref()
            .and_then(|schema| schema.child_for(segment))
            .cloned()
    }

    fn lookup(&self, segment: &PathSegment) -> Result<Lookup> {
        self.store.read(|root| {
            let current = self
                .path
                .resolve(root)
                .ok_or_else(|| Error::DanglingPath(self.path.clone()))?;
            let shape = NodeShape::of(current);
            let wrong_kind = matches!(
                (shape, segment),
                (NodeShape::Mapping, PathSegment::Index(_)) | (NodeShape::Sequence, PathSegment::Key(_))
            );
            let children = slots(current)
                .filter(|_| !wrong_kind)
                .ok_or_else(|| Error::not_a_container(&self.path, segment, SchemaType::of(current)))?;
            Ok(match children.slot(segment) {
                Some(child) if NodeShape::of(child).is_container() => Lookup::Container,
                Some(child) => Lookup::Scalar(child.clone()),
                None => Lookup::Missing {
                    shape,
                    len: children.slot_count(),
                },
            })
        })
    }

    /// Read one child
    ///
    /// Containers come back wrapped over the same storage and bound to the
    /// child schema; scalars come back as plain values. An absent child with
    /// a declared default yields the default, which is also stored when this
    /// node is a mapping.
    ///
    /// # Errors
    /// `KeyNotFound` / `IndexOutOfBounds` for an absent child with no
    /// default, `NotAContainer` when this node cannot hold `segment`.
    pub fn read(&self, segment: impl Into<PathSegment>) -> Result<Entry> {
        let segment = segment.into();
        match self.lookup(&segment)? {
            Lookup::Container => Ok(Entry::Node(self.attach_child(segment))),
            Lookup::Scalar(value) => Ok(Entry::Value(value)),
            Lookup::Missing { shape, len } => {
                let default = self
                    .effective
                    .as_ref()
                    .and_then(|schema| default_for(schema, &segment));
                match (default, &segment) {
                    (Some(default), PathSegment::Key(_)) if shape == NodeShape::Mapping => {
                        self.materialize(&segment, default)
                    }
                    (Some(default), _) => Ok(Entry::Value(default)),
                    (None, PathSegment::Key(key)) => Err(Error::key_not_found(&self.path, key)),
                    (None, PathSegment::Index(index)) => Err(Error::IndexOutOfBounds {
                        path: self.path.clone(),
                        index: *index,
                        len,
                    }),
                }
            }
        }
    }

    fn materialize(&self, segment: &PathSegment, default: Value) -> Result<Entry> {
        let is_container = NodeShape::of(&default).is_container();
        let stored = self.store.write(|root| {
            let (Some(Value::Object(map)), Some(key)) = (self.path.resolve_mut(root), segment.as_key())
            else {
                return Err(Error::DanglingPath(self.path.clone()));
            };
            Ok(map.entry(key.to_string()).or_insert(default).clone())
        })?;
        trace!(path = %self.path.append(segment.clone()), "materialized default on read");
        if is_container {
            Ok(Entry::Node(self.attach_child(segment.clone())))
        } else {
            Ok(Entry::Value(stored))
        }
    }

    /// Non-failing [`read`](Self::read)
    pub fn get(&self, segment: impl Into<PathSegment>) -> Option<Entry> {
        self.read(segment).ok()
    }

    /// Wrap one child as a node, scalars included
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    pub fn child(&self, segment: impl Into<PathSegment>) -> Result<ValidatingNode> {
        let segment = segment.into();
        match self.read(segment.clone())? {
            Entry::Node(node) => Ok(node),
            Entry::Value(_) => Ok(self.attach_child(segment)),
        }
    }

    /// Navigate a relative path
    ///
    /// # Errors
    /// The first navigation error along the path.
    pub fn at(&self, relative: &JsonPath) -> Result<ValidatingNode> {
        relative
            .segments()
            .iter()
            .try_fold(self.clone(), |node, segment| node.child(segment.clone()))
    }

    /// Validate and store one child
    ///
    /// The child schema is derived as in [`read`](Self::read). Defaults are
    /// filled into `value`, the result is validated recursively and only
    /// then committed. On a sequence, `segment` may be the current length to
    /// append.
    ///
    /// The value must satisfy its `properties` schema and every matching
    /// `patternProperties` schema. When this node's schema carries `oneOf`,
    /// `anyOf` or `if`, the branches are resolved against the container as
    /// it would be after the write, and the value must also satisfy the
    /// child schema of the selected branch (of at least one branch for
    /// `anyOf`).
    ///
    /// # Errors
    /// `Error::Validation` when the value or the growth of this container is
    /// rejected; storage is unchanged in that case.
    pub fn write(&self, segment: impl Into<PathSegment>, value: Value) -> Result<()> {
        let segment = segment.into();
        let target = self.path.append(segment.clone());
        let mut candidate = value;

        if self.store.config().fill_defaults
            && let Some(schema) = self.child_schema(&segment)
        {
            fill_defaults(&mut candidate, &schema, &target);
        }
        if let Some(schema) = &self.effective {
            let parent = if depends_on_value(schema) {
                Some(self.candidate_parent(&segment, &candidate)?)
            } else {
                None
            };
            self.check_child(schema, parent.as_ref(), &segment, &candidate, &target)
                .map_err(rejected)?;
        }

        self.store.write(|root| {
            let container = self
                .path
                .resolve_mut(root)
                .ok_or_else(|| Error::DanglingPath(self.path.clone()))?;
            let found = SchemaType::of(container);
            let children = slots_mut(container)
                .ok_or_else(|| Error::not_a_container(&self.path, &segment, found))?;

            if let Some(schema) = &self.effective
                && children.grows_with(&segment)
            {
                check_growth(schema, children.slot_count(), &segment, &candidate, &self.path)
                    .map_err(rejected)?;
            }

            children.put(&self.path, &segment, candidate)?;
            Ok(())
        })
    }

    /// This container with `candidate` put under `segment`, outside the store
    fn candidate_parent(&self, segment: &PathSegment, candidate: &Value) -> Result<Value> {
        let mut parent = self.to_value()?;
        let found = SchemaType::of(&parent);
        slots_mut(&mut parent)
            .ok_or_else(|| Error::not_a_container(&self.path, segment, found))?
            .put(&self.path, segment, candidate.clone())?;
        Ok(parent)
    }

    fn check_child(
        &self,
        schema: &Arc<SchemaNode>,
        parent: Option<&Value>,
        segment: &PathSegment,
        candidate: &Value,
        target: &JsonPath,
    ) -> SchemaValidationResult<()> {
        let schema = defaults::effective(schema);
        for child in schema.schemas_for(segment) {
            self.store.validator().validate(candidate, child, target)?;
        }
        let Some(parent) = parent else {
            return Ok(());
        };

        let composer = self.store.composer();
        let composition = schema.composition();
        if !composition.one_of.is_empty()
            && let Resolution::Rebound(branch) =
                composer.resolve(CompositionKind::OneOf, parent, Some(&schema), None, &self.path)?
        {
            self.check_child(&branch, Some(parent), segment, candidate, target)?;
        }
        if !composition.any_of.is_empty()
            && let Resolution::Branches(branches) =
                composer.resolve(CompositionKind::AnyOf, parent, Some(&schema), None, &self.path)?
        {
            let mut first_rejection = None;
            let accepted = branches.iter().any(|branch| {
                match self.check_child(branch, Some(parent), segment, candidate, target) {
                    Ok(()) => true,
                    Err(err) => {
                        first_rejection.get_or_insert(err);
                        false
                    }
                }
            });
            if !accepted && let Some(err) = first_rejection {
                return Err(err);
            }
        }
        if composition.conditional.is_some()
            && let Resolution::Rebound(branch) = composer.resolve(
                CompositionKind::IfThenElse,
                parent,
                Some(&schema),
                None,
                &self.path,
            )?
        {
            self.check_child(&branch, Some(parent), segment, candidate, target)?;
        }
        Ok(())
    }

    /// Plain deep copy of the current value, no validation
    ///
    /// # Errors
    /// Returns `DanglingPath` if the node no longer resolves.
    pub fn to_value(&self) -> Result<Value> {
        self.store
            .value_at(&self.path)
            .ok_or_else(|| Error::DanglingPath(self.path.clone()))
    }

    fn resolve(&self, kind: CompositionKind, explicit: Option<&SchemaNode>) -> Result<Resolution> {
        self.store.read(|root| {
            let data = self
                .path
                .resolve(root)
                .ok_or_else(|| Error::DanglingPath(self.path.clone()))?;
            let resolution = self.store.composer().resolve(
                kind,
                data,
                self.schema.as_ref(),
                explicit,
                &self.path,
            )?;
            Ok(resolution)
        })
    }

    /// Resolve any composition keyword
    ///
    /// `explicit` replaces the declared schema for `not` and `contains`.
    /// When the bound schema lacks the keyword the node itself is returned
    /// (as the only branch for `anyOf`).
    ///
    /// # Errors
    /// See [`CompositionService::resolve`](crate::domain::services::CompositionService::resolve).
    pub fn compose(
        &self,
        kind: CompositionKind,
        explicit: Option<&SchemaNode>,
    ) -> Result<CompositionOutcome> {
        let outcome = match (kind, self.resolve(kind, explicit)?) {
            (_, Resolution::Predicate(answer)) => CompositionOutcome::Predicate(answer),
            (_, Resolution::Branches(branches)) => CompositionOutcome::Branches(
                branches.into_iter().map(|schema| self.rebind(schema)).collect(),
            ),
            (CompositionKind::AllOf, Resolution::Rebound(schema)) => {
                CompositionOutcome::Merged(self.rebind(schema))
            }
            (_, Resolution::Rebound(schema)) => CompositionOutcome::Selected(self.rebind(schema)),
            (CompositionKind::AnyOf, Resolution::Unchanged) => {
                CompositionOutcome::Branches(vec![self.clone()])
            }
            (CompositionKind::AllOf, Resolution::Unchanged) => {
                CompositionOutcome::Merged(self.clone())
            }
            (_, Resolution::Unchanged) => CompositionOutcome::Selected(self.clone()),
        };
        Ok(outcome)
    }

    fn rebound(&self, kind: CompositionKind) -> Result<ValidatingNode> {
        Ok(match self.resolve(kind, None)? {
            Resolution::Rebound(schema) => self.rebind(schema),
            _ => self.clone(),
        })
    }

    /// Rebind to the single `oneOf` branch the value matches
    ///
    /// The branch is merged with the keywords next to `oneOf`.
    ///
    /// # Errors
    /// `CompositionFailure` with `NoMatch` or `MultipleMatches`.
    pub fn one_of(&self) -> Result<ValidatingNode> {
        self.rebound(CompositionKind::OneOf)
    }

    /// One node per matching `anyOf` branch, declaration order
    ///
    /// # Errors
    /// `CompositionFailure` with `NoMatch`.
    pub fn any_of(&self) -> Result<Vec<ValidatingNode>> {
        Ok(match self.resolve(CompositionKind::AnyOf, None)? {
            Resolution::Branches(branches) => {
                branches.into_iter().map(|schema| self.rebind(schema)).collect()
            }
            _ => vec![self.clone()],
        })
    }

    /// Rebind to the merge of the schema and its `allOf` branches
    ///
    /// # Errors
    /// `CompositionFailure` with `Unsatisfiable` for conflicting branches,
    /// or the value's violation of the merged schema.
    pub fn all_of(&self) -> Result<ValidatingNode> {
        self.rebound(CompositionKind::AllOf)
    }

    /// Whether the value fails `schema`, or the declared `not` schema
    ///
    /// `true` when there is no schema to test against.
    ///
    /// # Errors
    /// `DanglingPath` if the node no longer resolves.
    pub fn not_of(&self, schema: Option<&SchemaNode>) -> Result<bool> {
        Ok(match self.resolve(CompositionKind::Not, schema)? {
            Resolution::Predicate(answer) => answer,
            _ => true,
        })
    }

    /// Rebind to `then` or `else` depending on the `if` predicate
    ///
    /// An absent branch binds the unconstrained schema; with no `if` the
    /// node itself is returned.
    ///
    /// # Errors
    /// `DanglingPath` if the node no longer resolves.
    pub fn if_then(&self) -> Result<ValidatingNode> {
        self.rebound(CompositionKind::IfThenElse)
    }

    /// Whether some element matches `schema`, or the declared `contains`
    ///
    /// `false` for non-sequence data or when there is no schema.
    ///
    /// # Errors
    /// `DanglingPath` if the node no longer resolves.
    pub fn contains(&self, schema: Option<&SchemaNode>) -> Result<bool> {
        Ok(match self.resolve(CompositionKind::Contains, schema)? {
            Resolution::Predicate(answer) => answer,
            _ => false,
        })
    }

    /// Plain copy keeping only schema-declared keys, recursively
    ///
    /// # Errors
    /// Returns `DanglingPath` if the node no longer resolves; the projection
    /// itself never fails.
    pub fn project(&self) -> Result<Value> {
        self.store.read(|root| {
            let data = self
                .path
                .resolve(root)
                .ok_or_else(|| Error::DanglingPath(self.path.clone()))?;
            Ok(match &self.schema {
                Some(schema) => self.store.composer().project(data, schema),
                None => data.clone(),
            })
        })
    }
}

fn rejected(err: SchemaValidationError) -> Error {
    debug!(path = %err.path(), keyword = ?err.keyword(), "write rejected");
    Error::Validation(err)
}

/// Whether child rules depend on the container's value
fn depends_on_value(schema: &Arc<SchemaNode>) -> bool {
    let schema = defaults::effective(schema);
    let composition = schema.composition();
    !composition.one_of.is_empty()
        || !composition.any_of.is_empty()
        || composition.conditional.is_some()
}

/// Container-level rules that only a new child can break
fn check_growth(
    schema: &SchemaNode,
    count: usize,
    segment: &PathSegment,
    candidate: &Value,
    path: &JsonPath,
) -> SchemaValidationResult<()> {
    match segment {
        PathSegment::Key(key) => {
            let Some(rules) = schema.object() else {
                return Ok(());
            };
            if matches!(rules.additional_properties, Some(Additional::Forbidden))
                && !rules.is_declared(key)
            {
                return Err(SchemaValidationError::constraint(
                    &path.append_key(key),
                    Keyword::AdditionalProperties,
                    candidate,
                    format!("additional property '{key}' is not allowed"),
                ));
            }
            if let Some(max) = rules.max_properties
                && count >= max
            {
                return Err(SchemaValidationError::constraint(
                    path,
                    Keyword::MaxProperties,
                    candidate,
                    format!("adding '{key}' exceeds {max} properties"),
                ));
            }
        }
        PathSegment::Index(_) => {
            if let Some(max) = schema.array().and_then(|rules| rules.max_items)
                && count >= max
            {
                return Err(SchemaValidationError::constraint(
                    path,
                    Keyword::MaxItems,
                    candidate,
                    format!("appending exceeds {max} items"),
                ));
            }
        }
    }
    Ok(())
}
