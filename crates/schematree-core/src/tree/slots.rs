//! Mapping / sequence capability set
//!
//! Nodes never branch on the concrete container type themselves: they ask
//! [`slots`] / [`slots_mut`] for a [`ChildSlots`] view and go through it.
//! Scalars have no slots.

use serde_json::{Map, Value};

use crate::domain::{JsonPath, PathSegment, SchemaType};
use crate::error::{Error, Result};

/// Shape of a wrapped value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeShape {
    /// JSON object
    Mapping,
    /// JSON array
    Sequence,
    /// Anything else
    Scalar,
}

impl NodeShape {
    /// Shape of a value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Mapping,
            Value::Array(_) => Self::Sequence,
            _ => Self::Scalar,
        }
    }

    /// Whether the shape has children
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

/// Child access shared by mapping- and sequence-backed storage
pub trait ChildSlots {
    /// Child addressed by `segment`
    fn slot(&self, segment: &PathSegment) -> Option<&Value>;

    /// Store `value` under `segment`, returning the replaced child
    ///
    /// A sequence accepts its current length as an append position.
    ///
    /// # Errors
    /// `NotAContainer` for a segment of the wrong kind, `IndexOutOfBounds`
    /// past the append position. `path` is the location of this container.
    fn put(&mut self, path: &JsonPath, segment: &PathSegment, value: Value)
    -> Result<Option<Value>>;

    /// Remove and return the child addressed by `segment`
    ///
    /// Mappings keep the order of the remaining keys; sequences shift.
    fn take(&mut self, segment: &PathSegment) -> Option<Value>;

    /// Number of children
    fn slot_count(&self) -> usize;

    /// Segments of every child in storage order
    fn segments(&self) -> Vec<PathSegment>;

    /// Remove every child
    fn clear_slots(&mut self);

    /// Whether storing under `segment` would add a child
    fn grows_with(&self, segment: &PathSegment) -> bool {
        self.slot(segment).is_none()
    }
}

impl ChildSlots for Map<String, Value> {
    fn slot(&self, segment: &PathSegment) -> Option<&Value> {
        segment.as_key().and_then(|key| self.get(key))
    }

    fn put(
        &mut self,
        path: &JsonPath,
        segment: &PathSegment,
        value: Value,
    ) -> Result<Option<Value>> {
        match segment {
            PathSegment::Key(key) => Ok(self.insert(key.clone(), value)),
            PathSegment::Index(_) => Err(Error::not_a_container(path, segment, SchemaType::Object)),
        }
    }

    fn take(&mut self, segment: &PathSegment) -> Option<Value> {
        segment.as_key().and_then(|key| self.shift_remove(key))
    }

    fn slot_count(&self) -> usize {
        self.len()
    }

    fn segments(&self) -> Vec<PathSegment> {
        self.keys().map(PathSegment::from).collect()
    }

    fn clear_slots(&mut self) {
        self.clear();
    }
}

impl ChildSlots for Vec<Value> {
    fn slot(&self, segment: &PathSegment) -> Option<&Value> {
        segment.as_index().and_then(|index| self.get(index))
    }

    fn put(
        &mut self,
        path: &JsonPath,
        segment: &PathSegment,
        value: Value,
    ) -> Result<Option<Value>> {
        let PathSegment::Index(index) = *segment else {
            return Err(Error::not_a_container(path, segment, SchemaType::Array));
        };
        match index.cmp(&self.len()) {
            std::cmp::Ordering::Less => Ok(Some(std::mem::replace(&mut self[index], value))),
            std::cmp::Ordering::Equal => {
                self.push(value);
                Ok(None)
            }
            std::cmp::Ordering::Greater => Err(Error::IndexOutOfBounds {
                path: path.clone(),
                index,
                len: self.len(),
            }),
        }
    }

    fn take(&mut self, segment: &PathSegment) -> Option<Value> {
        segment
            .as_index()
            .filter(|index| *index < self.len())
            .map(|index| self.remove(index))
    }

    fn slot_count(&self) -> usize {
        self.len()
    }

    fn segments(&self) -> Vec<PathSegment> {
        (0..self.len()).map(PathSegment::Index).collect()
    }

    fn clear_slots(&mut self) {
        self.clear();
    }
}

/// Slot view of a container value, `None` for scalars
pub fn slots(value: &Value) -> Option<&dyn ChildSlots> {
    match value {
        Value::Object(map) => Some(map as &dyn ChildSlots),
        Value::Array(items) => Some(items as &dyn ChildSlots),
        _ => None,
    }
}

/// Mutable slot view of a container value, `None` for scalars
pub fn slots_mut(value: &mut Value) -> Option<&mut dyn ChildSlots> {
    match value {
        Value::Object(map) => Some(map as &mut dyn ChildSlots),
        Value::Array(items) => Some(items as &mut dyn ChildSlots),
        _ => None,
    }
}
