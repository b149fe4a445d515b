//! Snapshots of a node as plain data plus its schema document

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::node::ValidatingNode;
use super::store::TreeStore;
use crate::config::ValidationConfig;
use crate::domain::SchemaNode;
use crate::error::{Error, Result};

/// Serializable form of a node
///
/// Restoring a snapshot re-parses the schema document, so the restored node
/// validates exactly like the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Plain data
    pub data: Value,
    /// Bound schema document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl TreeSnapshot {
    /// Rebuild a node in a new store with default configuration
    ///
    /// # Errors
    /// `Error::Schema` if the schema document no longer parses.
    pub fn restore(self) -> Result<ValidatingNode> {
        self.restore_with(ValidationConfig::default())
    }

    /// Rebuild a node in a new store with `config`
    ///
    /// # Errors
    /// `Error::Schema` if the schema document no longer parses.
    pub fn restore_with(self, config: ValidationConfig) -> Result<ValidatingNode> {
        let schema = self
            .schema
            .as_ref()
            .map(SchemaNode::shared)
            .transpose()?;
        Ok(ValidatingNode::new(
            TreeStore::with_config(self.data, config),
            schema,
        ))
    }
}

impl ValidatingNode {
    /// Capture the current value and the bound schema document
    ///
    /// # Errors
    /// Returns `DanglingPath` if the node no longer resolves.
    pub fn snapshot(&self) -> Result<TreeSnapshot> {
        Ok(TreeSnapshot {
            data: self.to_value()?,
            schema: self.schema().map(|schema| schema.raw().clone()),
        })
    }

    /// Snapshot encoded as a JSON string
    ///
    /// # Errors
    /// `DanglingPath` or a serialization failure.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot()?)?)
    }

    /// Restore a node from [`to_json_string`](Self::to_json_string) output
    ///
    /// # Errors
    /// `Error::Json` for malformed input, `Error::Schema` for a schema
    /// document that does not parse.
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str::<TreeSnapshot>(input)?.restore()
    }
}

impl Serialize for ValidatingNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.store().read(|root| match self.path().resolve(root) {
            Some(value) => value.serialize(serializer),
            None => Err(serde::ser::Error::custom(Error::DanglingPath(
                self.path().clone(),
            ))),
        })
    }
}
