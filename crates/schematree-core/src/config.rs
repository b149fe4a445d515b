//! Validation configuration
//!
//! One [`ValidationConfig`] is carried by each tree store, so every alias of
//! a tree validates with the same settings.

use serde::{Deserialize, Serialize};

/// Settings for validation and default filling
///
/// # Examples
/// ```
/// # use schematree::ValidationConfig;
/// let config: ValidationConfig = serde_json::from_str(r#"{"max_depth": 16}"#).unwrap();
/// assert_eq!(config.max_depth, 16);
/// assert!(config.fill_defaults);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum nesting depth validated before failing with `DepthExceeded`
    pub max_depth: usize,
    /// Absolute tolerance of the `multipleOf` remainder check
    pub multiple_of_tolerance: f64,
    /// Whether declared `default`s are filled in on construction and writes
    pub fill_defaults: bool,
}

impl ValidationConfig {
    /// Default maximum validation depth
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Default `multipleOf` tolerance
    pub const DEFAULT_MULTIPLE_OF_TOLERANCE: f64 = 1e-9;

    /// Shallow depth limit and exact `multipleOf`
    pub fn strict() -> Self {
        Self {
            max_depth: 32,
            multiple_of_tolerance: 0.0,
            fill_defaults: true,
        }
    }

    /// Override the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Turn default filling on or off
    pub fn with_fill_defaults(mut self, fill_defaults: bool) -> Self {
        self.fill_defaults = fill_defaults;
        self
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            multiple_of_tolerance: Self::DEFAULT_MULTIPLE_OF_TOLERANCE,
            fill_defaults: true,
        }
    }
}
