//! Merging schema fragments for `allOf`
//!
//! Fragments are merged as raw documents and parsed once afterwards. Each
//! keyword has its own rule: bounds tighten, `required` and `properties`
//! union, `type` and `enum` intersect. Keywords with no merge rule that
//! differ between fragments are nested into a synthetic `allOf`, so the
//! result still enforces both.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::equality::values_equal;
use super::keyword::{Keyword, TypeSet};
use super::schema::{SchemaError, SchemaNode, SchemaResult};

const LOWER_BOUNDS: [&str; 5] = [
    "minimum",
    "exclusiveMinimum",
    "minLength",
    "minItems",
    "minProperties",
];

const UPPER_BOUNDS: [&str; 5] = [
    "maximum",
    "exclusiveMaximum",
    "maxLength",
    "maxItems",
    "maxProperties",
];

const MULTIPLE_TOLERANCE: f64 = 1e-9;

/// Merge raw schema documents left to right into one document
///
/// `true` fragments contribute nothing; any `false` fragment makes the
/// result `false`.
///
/// # Errors
/// Returns `SchemaError::MergeConflict` when two fragments can never be
/// satisfied together (disjoint `type` or `enum`, differing `const`), and
/// `SchemaError::NotASchema` when a fragment is not a schema.
pub fn merge_schemas(parts: &[&Value]) -> SchemaResult<Value> {
    parts
        .iter()
        .try_fold(Value::Bool(true), |acc, part| merge_pair(&acc, part))
}

impl SchemaNode {
    /// Merge nodes into one shareable node
    ///
    /// Each part's own `allOf` is folded in first.
    ///
    /// # Errors
    /// See [`merge_schemas`].
    pub fn merge(parts: &[&SchemaNode]) -> SchemaResult<Arc<SchemaNode>> {
        let flattened = parts
            .iter()
            .map(|part| flatten_all_of(part.raw()))
            .collect::<SchemaResult<Vec<_>>>()?;
        let refs: Vec<&Value> = flattened.iter().collect();
        SchemaNode::shared(&merge_schemas(&refs)?)
    }

    /// This node with its `allOf` branches merged into it
    ///
    /// Returns the node itself when there is no `allOf`.
    ///
    /// # Errors
    /// See [`merge_schemas`].
    pub fn effective(self: &Arc<Self>) -> SchemaResult<Arc<SchemaNode>> {
        if self.composition.all_of.is_empty() {
            return Ok(Arc::clone(self));
        }
        SchemaNode::shared(&flatten_all_of(&self.raw)?)
    }
}

fn flatten_all_of(raw: &Value) -> SchemaResult<Value> {
    let Some(Value::Array(branches)) = raw.get("allOf") else {
        return Ok(raw.clone());
    };

    let mut base = raw.clone();
    if let Value::Object(map) = &mut base {
        map.remove("allOf");
    }
    let mut parts = vec![base];
    for branch in branches {
        parts.push(flatten_all_of(branch)?);
    }
    let refs: Vec<&Value> = parts.iter().collect();
    merge_schemas(&refs)
}

fn merge_pair(a: &Value, b: &Value) -> SchemaResult<Value> {
    let (left, right) = match (a, b) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => return Ok(Value::Bool(false)),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => {
            return match other {
                Value::Object(_) | Value::Bool(_) => Ok(other.clone()),
                _ => Err(not_a_schema(other)),
            };
        }
        (Value::Object(left), Value::Object(right)) => (left, right),
        (Value::Object(_), other) | (other, _) => return Err(not_a_schema(other)),
    };

    let mut merged = left.clone();
    let mut nested: Vec<Value> = Vec::new();

    // The conditional triple only makes sense as a unit
    let conditional_clash = left.contains_key("if") && right.contains_key("if");
    if conditional_clash {
        let triple: Map<String, Value> = ["if", "then", "else"]
            .iter()
            .filter_map(|k| right.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();
        nested.push(Value::Object(triple));
    }

    for (name, theirs) in right {
        if conditional_clash && matches!(name.as_str(), "if" | "then" | "else") {
            continue;
        }
        let Some(ours) = merged.get(name) else {
            merged.insert(name.clone(), theirs.clone());
            continue;
        };
        match combine(name, ours, theirs)? {
            Combined::Value(value) => {
                merged.insert(name.clone(), value);
            }
            Combined::Nest => {
                let mut wrapper = Map::new();
                wrapper.insert(name.clone(), theirs.clone());
                nested.push(Value::Object(wrapper));
            }
        }
    }

    if !nested.is_empty() {
        let mut all_of = match merged.remove("allOf") {
            Some(Value::Array(existing)) => existing,
            _ => Vec::new(),
        };
        all_of.extend(nested);
        merged.insert("allOf".to_string(), Value::Array(all_of));
    }

    Ok(Value::Object(merged))
}

enum Combined {
    Value(Value),
    Nest,
}

fn combine(name: &str, ours: &Value, theirs: &Value) -> SchemaResult<Combined> {
    if values_equal(ours, theirs) {
        return Ok(Combined::Value(ours.clone()));
    }

    let value = match name {
        "type" => {
            let left = TypeSet::from_keyword(ours).map_err(|m| conflict(Keyword::Type, m))?;
            let right = TypeSet::from_keyword(theirs).map_err(|m| conflict(Keyword::Type, m))?;
            let both = left.intersect(right);
            if both.is_empty() {
                return Err(conflict(
                    Keyword::Type,
                    format!("{left} and {right} have no type in common"),
                ));
            }
            both.to_keyword()
        }
        "required" => {
            let mut keys = as_array(ours);
            for key in as_array(theirs) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            Value::Array(keys)
        }
        "properties" | "patternProperties" => merge_members(ours, theirs, merge_pair)?,
        "dependencies" | "dependentRequired" | "dependentSchemas" => {
            merge_members(ours, theirs, |a, b| {
                merge_pair(&dependency_schema(a), &dependency_schema(b))
            })?
        }
        "additionalProperties" => merge_pair(ours, theirs)?,
        "items" if !ours.is_array() && !theirs.is_array() => merge_pair(ours, theirs)?,
        "uniqueItems" => Value::Bool(ours.as_bool() == Some(true) || theirs.as_bool() == Some(true)),
        "enum" => {
            let left = as_array(ours);
            let right = as_array(theirs);
            let shared: Vec<Value> = left
                .into_iter()
                .filter(|v| right.iter().any(|w| values_equal(v, w)))
                .collect();
            if shared.is_empty() {
                return Err(conflict(Keyword::Enum, "no value is allowed by both fragments"));
            }
            Value::Array(shared)
        }
        "const" => {
            return Err(conflict(
                Keyword::Const,
                format!("{ours} and {theirs} differ"),
            ));
        }
        "multipleOf" => match (ours.as_f64(), theirs.as_f64()) {
            (Some(a), Some(b)) if is_multiple(a, b) => ours.clone(),
            (Some(a), Some(b)) if is_multiple(b, a) => theirs.clone(),
            _ => return Ok(Combined::Nest),
        },
        "allOf" => {
            let mut branches = as_array(ours);
            branches.extend(as_array(theirs));
            Value::Array(branches)
        }
        "default" => theirs.clone(),
        bound if LOWER_BOUNDS.contains(&bound) => pick_bound(ours, theirs, |a, b| a >= b),
        bound if UPPER_BOUNDS.contains(&bound) => pick_bound(ours, theirs, |a, b| a <= b),
        other if Keyword::from_name(other).is_none() => ours.clone(),
        _ => return Ok(Combined::Nest),
    };
    Ok(Combined::Value(value))
}

fn merge_members(
    ours: &Value,
    theirs: &Value,
    merge: impl Fn(&Value, &Value) -> SchemaResult<Value>,
) -> SchemaResult<Value> {
    let (Value::Object(left), Value::Object(right)) = (ours, theirs) else {
        return Ok(theirs.clone());
    };
    let mut merged = left.clone();
    for (name, schema) in right {
        let combined = match merged.get(name) {
            Some(existing) => merge(existing, schema)?,
            None => schema.clone(),
        };
        merged.insert(name.clone(), combined);
    }
    Ok(Value::Object(merged))
}

fn dependency_schema(value: &Value) -> Value {
    match value {
        Value::Array(keys) => {
            let mut map = Map::new();
            map.insert("required".to_string(), Value::Array(keys.clone()));
            Value::Object(map)
        }
        other => other.clone(),
    }
}

fn pick_bound(ours: &Value, theirs: &Value, keep_ours: impl Fn(f64, f64) -> bool) -> Value {
    match (ours.as_f64(), theirs.as_f64()) {
        (Some(a), Some(b)) if !keep_ours(a, b) => theirs.clone(),
        _ => ours.clone(),
    }
}

/// Whether `a` is an integer multiple of `b`
fn is_multiple(a: f64, b: f64) -> bool {
    if b == 0.0 {
        return false;
    }
    let ratio = a / b;
    (ratio - ratio.round()).abs() <= MULTIPLE_TOLERANCE
}

fn as_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn conflict(keyword: Keyword, message: impl Into<String>) -> SchemaError {
    SchemaError::MergeConflict {
        keyword,
        message: message.into(),
    }
}

fn not_a_schema(value: &Value) -> SchemaError {
    SchemaError::NotASchema {
        pointer: "#/allOf".to_string(),
        found: super::keyword::SchemaType::of(value).to_string(),
    }
}
