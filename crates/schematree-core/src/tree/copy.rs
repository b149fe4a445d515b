//! Duplication and merging of nodes

use serde_json::{Map, Value};

use super::node::ValidatingNode;
use crate::domain::{JsonPath, PathSegment, SchemaType};
use crate::error::{Error, Result};

impl ValidatingNode {
    /// Another handle to the same storage and schema
    ///
    /// Writes through either handle are visible through both.
    pub fn shallow_copy(&self) -> ValidatingNode {
        self.clone()
    }

    /// Independent copy of the current value, bound to the same schema
    ///
    /// The copy lives in its own store with this tree's configuration and
    /// shares only the schema `Arc`.
    ///
    /// # Errors
    /// Returns `DanglingPath` if the node no longer resolves.
    pub fn deep_copy(&self) -> Result<ValidatingNode> {
        let store = self.store().fresh(self.to_value()?);
        Ok(ValidatingNode::new(store, self.schema().cloned()))
    }

    /// New mapping holding the keys of both nodes, `other` winning on overlap
    ///
    /// The result has its own storage and this node's schema. The merged
    /// value is not re-validated.
    ///
    /// # Errors
    /// `NotAContainer` when either side is not a mapping.
    pub fn merged_with(&self, other: &ValidatingNode) -> Result<ValidatingNode> {
        let mut merged = mapping(self.path(), self.to_value()?)?;
        merged.extend(mapping(other.path(), other.to_value()?)?);
        let store = self.store().fresh(Value::Object(merged));
        Ok(ValidatingNode::new(store, self.schema().cloned()))
    }
}

fn mapping(path: &JsonPath, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::not_a_container(
            path,
            &PathSegment::Index(0),
            SchemaType::of(&other),
        )),
    }
}
