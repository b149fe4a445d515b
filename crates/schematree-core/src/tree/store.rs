//! Shared storage arena for one tree
//!
//! A [`TreeStore`] owns the root value of a tree. Every
//! [`ValidatingNode`](super::ValidatingNode) holds a clone of the store
//! handle plus a path into it, so a write through any alias is visible
//! through all of them.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ValidationConfig;
use crate::domain::services::{CompositionService, ValidationService};
use crate::domain::JsonPath;

/// Handle to the storage arena of one tree
///
/// Cloning the handle shares the arena.
///
/// # Examples
/// ```
/// # use schematree::TreeStore;
/// # use serde_json::json;
/// let store = TreeStore::new(json!({"user": {"name": "Alice"}}));
/// let alias = store.clone();
/// alias.write(|root| root["user"]["name"] = json!("Bob"));
///
/// assert_eq!(store.snapshot()["user"]["name"], "Bob");
/// ```
#[derive(Debug, Clone)]
pub struct TreeStore {
    root: Arc<RwLock<Value>>,
    config: Arc<ValidationConfig>,
    composer: CompositionService,
}

impl TreeStore {
    /// Create a store with default configuration
    pub fn new(value: Value) -> Self {
        Self::with_config(value, ValidationConfig::default())
    }

    /// Create a store with custom configuration
    pub fn with_config(value: Value, config: ValidationConfig) -> Self {
        let validator = Arc::new(ValidationService::from_config(&config));
        Self {
            root: Arc::new(RwLock::new(value)),
            config: Arc::new(config),
            composer: CompositionService::new(validator),
        }
    }

    /// Create a separate arena holding `value`, sharing this store's configuration
    pub fn fresh(&self, value: Value) -> Self {
        Self {
            root: Arc::new(RwLock::new(value)),
            config: Arc::clone(&self.config),
            composer: self.composer.clone(),
        }
    }

    /// Configuration shared by every alias of this tree
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validator configured for this tree
    pub fn validator(&self) -> &ValidationService {
        self.composer.validator()
    }

    /// Composition resolver configured for this tree
    pub fn composer(&self) -> &CompositionService {
        &self.composer
    }

    /// Deep copy of the whole tree
    pub fn snapshot(&self) -> Value {
        self.root.read().clone()
    }

    /// Deep copy of the value at `path`
    pub fn value_at(&self, path: &JsonPath) -> Option<Value> {
        let root = self.root.read();
        path.resolve(&root).cloned()
    }

    /// Run `f` with shared access to the root
    pub fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.root.read())
    }

    /// Run `f` with exclusive access to the root
    ///
    /// The lock is held for the whole closure, so one call is atomic.
    pub fn write<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.root.write())
    }

    /// Whether both handles share one arena
    pub fn ptr_eq(&self, other: &TreeStore) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }
}

impl From<Value> for TreeStore {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_arena() {
        let store = TreeStore::new(json!({"a": 1}));
        let alias = store.clone();
        alias.write(|root| root["a"] = json!(2));
        assert_eq!(store.snapshot(), json!({"a": 2}));
        assert!(store.ptr_eq(&alias));
    }

    #[test]
    fn test_fresh_store_is_separate() {
        let store = TreeStore::with_config(json!(1), ValidationConfig::strict());
        let other = store.fresh(json!(2));
        assert!(!store.ptr_eq(&other));
        assert_eq!(other.config(), &ValidationConfig::strict());
        assert_eq!(store.snapshot(), json!(1));
    }

    #[test]
    fn test_value_at() {
        let store = TreeStore::new(json!({"user": {"tags": ["a"]}}));
        let path = JsonPath::parse("$.user.tags[0]").unwrap();
        assert_eq!(store.value_at(&path), Some(json!("a")));
        assert_eq!(store.value_at(&JsonPath::parse("$.nope").unwrap()), None);
    }

    #[test]
    fn test_validator_uses_config() {
        let store = TreeStore::with_config(json!(null), ValidationConfig::default().with_max_depth(3));
        assert_eq!(store.validator().max_depth(), 3);
    }
}
