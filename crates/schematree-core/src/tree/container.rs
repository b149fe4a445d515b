//! Mapping and sequence conveniences on top of read/write
//!
//! Everything here goes through [`ChildSlots`](super::slots::ChildSlots), so
//! the same calls work on both container shapes. Scalars behave as empty
//! containers for the read-only queries and refuse the mutating ones.

use serde_json::Value;

use super::node::{Entry, ValidatingNode};
use super::slots::{NodeShape, slots, slots_mut};
use crate::domain::{PathSegment, SchemaNode, SchemaType};
use crate::error::{Error, Result};
use std::sync::Arc;

impl ValidatingNode {
    /// Build a mapping holding `value` under every key, then bind `schema`
    pub fn from_keys<I, K>(keys: I, value: Value, schema: Option<Arc<SchemaNode>>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let map = keys
            .into_iter()
            .map(|key| (key.into(), value.clone()))
            .collect();
        Self::from_value(Value::Object(map), schema)
    }

    /// Remove one child and return its plain value
    ///
    /// Removal is not validated, so it may leave a `required` key missing.
    ///
    /// # Errors
    /// `KeyNotFound` / `IndexOutOfBounds` for an absent child,
    /// `NotAContainer` on a scalar.
    pub fn remove(&self, segment: impl Into<PathSegment>) -> Result<Value> {
        let segment = segment.into();
        let path = self.path();
        self.store().write(|root| {
            let container = path
                .resolve_mut(root)
                .ok_or_else(|| Error::DanglingPath(path.clone()))?;
            let found = SchemaType::of(container);
            let children = slots_mut(container)
                .ok_or_else(|| Error::not_a_container(path, &segment, found))?;
            let len = children.slot_count();
            children.take(&segment).ok_or_else(|| match &segment {
                PathSegment::Key(key) => Error::key_not_found(path, key),
                PathSegment::Index(index) => Error::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                    len,
                },
            })
        })
    }

    /// Child segments in storage order; keys keep insertion order
    pub fn keys(&self) -> Vec<PathSegment> {
        self.store().read(|root| {
            self.path()
                .resolve(root)
                .and_then(slots)
                .map(|children| children.segments())
                .unwrap_or_default()
        })
    }

    /// Number of children, zero for scalars
    pub fn len(&self) -> usize {
        self.store().read(|root| {
            self.path()
                .resolve(root)
                .and_then(slots)
                .map_or(0, |children| children.slot_count())
        })
    }

    /// Whether there are no children
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a child is stored under `segment`
    ///
    /// Declared defaults do not count until they are materialized.
    pub fn contains_key(&self, segment: impl Into<PathSegment>) -> bool {
        let segment = segment.into();
        self.store().read(|root| {
            self.path()
                .resolve(root)
                .and_then(slots)
                .is_some_and(|children| children.slot(&segment).is_some())
        })
    }

    /// Every child as read through [`read`](ValidatingNode::read)
    ///
    /// # Errors
    /// The first read error, e.g. `DanglingPath`.
    pub fn entries(&self) -> Result<Vec<(PathSegment, Entry)>> {
        self.keys()
            .into_iter()
            .map(|segment| {
                let entry = self.read(segment.clone())?;
                Ok((segment, entry))
            })
            .collect()
    }

    /// Read `segment`, writing `value` first if it is absent
    ///
    /// # Errors
    /// Any error of [`write`](ValidatingNode::write) for the absent case.
    pub fn set_default(&self, segment: impl Into<PathSegment>, value: Value) -> Result<Entry> {
        let segment = segment.into();
        if !self.contains_key(segment.clone()) {
            self.write(segment.clone(), value)?;
        }
        self.read(segment)
    }

    /// Write every member of a mapping, in order
    ///
    /// Each member is validated on its own; members written before a
    /// rejection stay written.
    ///
    /// # Errors
    /// `NotAContainer` when `other` is not a mapping, or the first rejected
    /// write.
    pub fn update(&self, other: Value) -> Result<()> {
        let found = SchemaType::of(&other);
        let Value::Object(members) = other else {
            return Err(Error::not_a_container(self.path(), &PathSegment::Index(0), found));
        };
        for (key, value) in members {
            self.write(key, value)?;
        }
        Ok(())
    }

    /// Remove every child
    ///
    /// # Errors
    /// `NotAContainer` on a scalar.
    pub fn clear(&self) -> Result<()> {
        let path = self.path();
        self.store().write(|root| {
            let container = path
                .resolve_mut(root)
                .ok_or_else(|| Error::DanglingPath(path.clone()))?;
            let found = SchemaType::of(container);
            slots_mut(container)
                .ok_or_else(|| Error::not_a_container(path, &PathSegment::Index(0), found))?
                .clear_slots();
            Ok(())
        })
    }

    /// Append to a sequence
    ///
    /// # Errors
    /// Same as [`write`](ValidatingNode::write) at index `len`.
    pub fn push(&self, value: Value) -> Result<()> {
        self.write(self.len(), value)
    }

    /// Whether the current value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self.shape(), Ok(NodeShape::Mapping))
    }

    /// Whether the current value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self.shape(), Ok(NodeShape::Sequence))
    }
}
