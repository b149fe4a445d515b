//! JSON path value object
//!
//! A [`JsonPath`] locates one value inside a data tree as a list of object
//! keys and array indices. Wrappers over a shared tree hold a path instead of
//! a reference, so every alias resolves against the same storage.

use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

use crate::{DomainError, DomainResult};

/// One step of a [`JsonPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

impl PathSegment {
    /// Key name, if this is an object member step
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// Array index, if this is an array element step
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<&String> for PathSegment {
    fn from(key: &String) -> Self {
        Self::Key(key.clone())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Location of a value inside a JSON tree, rendered as `$.user.tags[0]`
///
/// # Examples
/// ```
/// # use schematree_domain::value_objects::JsonPath;
/// let path = JsonPath::root().append_key("user").append_index(2);
/// assert_eq!(path.to_string(), "$.user[2]");
/// assert_eq!(path.depth(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: SmallVec<[PathSegment; 8]>,
}

impl JsonPath {
    /// The root path `$`
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parse the textual form produced by `Display`
    ///
    /// Accepts `$`, `.name` steps for identifier keys, `["any key"]` steps
    /// with JSON string escaping and `[N]` index steps.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` on malformed input.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let rest = input
            .strip_prefix('$')
            .ok_or_else(|| DomainError::invalid_path(format!("'{input}' must start with '$'")))?;

        let bytes = rest.as_bytes();
        let mut segments = SmallVec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    let start = pos + 1;
                    let mut end = start;
                    while end < bytes.len() && is_ident_byte(bytes[end]) {
                        end += 1;
                    }
                    if end == start {
                        return Err(DomainError::invalid_path(format!(
                            "'{input}': empty key after '.'"
                        )));
                    }
                    segments.push(PathSegment::Key(rest[start..end].to_string()));
                    pos = end;
                }
                b'[' if bytes.get(pos + 1) == Some(&b'"') => {
                    let start = pos + 1;
                    let mut end = start + 1;
                    let mut escaped = false;
                    while end < bytes.len() && (escaped || bytes[end] != b'"') {
                        escaped = !escaped && bytes[end] == b'\\';
                        end += 1;
                    }
                    if bytes.get(end + 1) != Some(&b']') {
                        return Err(DomainError::invalid_path(format!(
                            "'{input}': unterminated quoted key"
                        )));
                    }
                    let key: String = serde_json::from_str(&rest[start..=end])
                        .map_err(|e| DomainError::invalid_path(format!("'{input}': {e}")))?;
                    segments.push(PathSegment::Key(key));
                    pos = end + 2;
                }
                b'[' => {
                    let close = rest[pos..].find(']').map(|i| pos + i).ok_or_else(|| {
                        DomainError::invalid_path(format!("'{input}': missing ']'"))
                    })?;
                    let index = rest[pos + 1..close].parse::<usize>().map_err(|_| {
                        DomainError::invalid_path(format!(
                            "'{input}': invalid index '{}'",
                            &rest[pos + 1..close]
                        ))
                    })?;
                    segments.push(PathSegment::Index(index));
                    pos = close + 1;
                }
                other => {
                    return Err(DomainError::invalid_path(format!(
                        "'{input}': unexpected character '{}'",
                        other as char
                    )));
                }
            }
        }

        Ok(Self { segments })
    }

    /// Child path for an object member
    pub fn append_key(&self, key: impl Into<String>) -> Self {
        self.append(PathSegment::Key(key.into()))
    }

    /// Child path for an array element
    pub fn append_index(&self, index: usize) -> Self {
        self.append(PathSegment::Index(index))
    }

    /// Child path for any segment
    pub fn append(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Concatenate a relative path
    pub fn join(&self, relative: &JsonPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// Parent path, `None` at the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Last segment, `None` at the root
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// All segments from the root
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is `$`
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `other` starts with this path
    pub fn is_prefix_of(&self, other: &JsonPath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(other.segments.iter()).all(|(a, b)| a == b)
    }

    /// Resolve against a tree
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Resolve mutably against a tree
    pub fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
                _ => None,
            })
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_ident(key: &str) -> bool {
    !key.is_empty()
        && !key.as_bytes()[0].is_ascii_digit()
        && key.bytes().all(is_ident_byte)
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) if is_ident(key) => write!(f, ".{key}")?,
                PathSegment::Key(key) => {
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{quoted}]")?
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
