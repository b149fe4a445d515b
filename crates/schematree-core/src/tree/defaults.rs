//! Default filling
//!
//! Inserts the `default` of every declared property missing from a mapping,
//! then descends into children that have their own sub-schema. Filling never
//! fails and never validates.

use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use crate::domain::{JsonPath, PathSegment, SchemaNode};

/// Fill missing defaults into `value`, returning how many were inserted
pub(crate) fn fill_defaults(value: &mut Value, schema: &Arc<SchemaNode>, path: &JsonPath) -> usize {
    let schema = effective(schema);
    let mut filled = 0;

    match value {
        Value::Object(object) => {
            for (name, default) in schema.property_defaults() {
                if !object.contains_key(name) {
                    trace!(path = %path.append_key(name), "materialized default");
                    object.insert(name.to_string(), default.clone());
                    filled += 1;
                }
            }
            for (key, child) in object.iter_mut() {
                if let Some(child_schema) = schema.child_for_key(key) {
                    filled += fill_defaults(child, child_schema, &path.append_key(key));
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                if let Some(child_schema) = schema.child_for_index(i) {
                    filled += fill_defaults(item, child_schema, &path.append_index(i));
                }
            }
        }
        _ => {}
    }

    filled
}

/// Declared default for an absent child
pub(crate) fn default_for(schema: &SchemaNode, segment: &PathSegment) -> Option<Value> {
    schema.child_for(segment)?.default_value().cloned()
}

/// Schema with its `allOf` folded in, or the schema itself when the fold
/// is unsatisfiable
pub(crate) fn effective(schema: &Arc<SchemaNode>) -> Arc<SchemaNode> {
    schema.effective().unwrap_or_else(|err| {
        trace!(error = %err, "allOf fold skipped");
        Arc::clone(schema)
    })
}
