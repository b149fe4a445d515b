//! Error types for schematree operations

use schematree_domain::{
    DomainError, JsonPath, PathSegment, SchemaError, SchemaType, SchemaValidationError,
};

/// Result type alias for schematree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for schematree operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A value failed its schema; storage was left untouched
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    /// Malformed schema document
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Read of an absent key with no declared default
    #[error("Key '{key}' not found at '{path}'")]
    KeyNotFound {
        /// Path of the mapping
        path: JsonPath,
        /// Missing key
        key: String,
    },

    /// Read or write past the end of a sequence
    #[error("Index {index} out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds {
        /// Path of the sequence
        path: JsonPath,
        /// Requested index
        index: usize,
        /// Sequence length
        len: usize,
    },

    /// Segment does not address a child of the value at `path`
    #[error("Cannot address '{segment}' inside {found} at '{path}'")]
    NotAContainer {
        /// Path of the value
        path: JsonPath,
        /// Requested segment
        segment: PathSegment,
        /// Runtime type of the value
        found: SchemaType,
    },

    /// Node path no longer resolves, e.g. after its parent was replaced
    #[error("Path '{0}' no longer resolves in its tree")]
    DanglingPath(JsonPath),

    /// Invalid path text
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    /// Create a key-not-found error
    pub fn key_not_found(path: &JsonPath, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            path: path.clone(),
            key: key.into(),
        }
    }

    /// Create a not-a-container error
    pub fn not_a_container(path: &JsonPath, segment: &PathSegment, found: SchemaType) -> Self {
        Self::NotAContainer {
            path: path.clone(),
            segment: segment.clone(),
            found,
        }
    }

    /// Validation failure, if this is one
    pub fn as_validation(&self) -> Option<&SchemaValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematree_domain::Keyword;
    use serde_json::json;

    #[test]
    fn test_validation_error_is_transparent() {
        let inner = SchemaValidationError::constraint(
            &JsonPath::root().append_key("age"),
            Keyword::Minimum,
            &json!(-1),
            "-1 is less than minimum 0",
        );
        let err = Error::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.as_validation(), Some(&inner));
    }

    #[test]
    fn test_navigation_error_display() {
        let err = Error::key_not_found(&JsonPath::root().append_key("user"), "name");
        assert_eq!(err.to_string(), "Key 'name' not found at '$.user'");

        let err = Error::not_a_container(
            &JsonPath::root(),
            &PathSegment::Index(0),
            SchemaType::String,
        );
        assert_eq!(err.to_string(), "Cannot address '[0]' inside string at '$'");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
