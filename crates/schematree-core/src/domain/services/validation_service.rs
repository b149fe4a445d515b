//! Schema validation domain service
//!
//! Provides core validation logic for JSON data against parsed schema
//! fragments. This is a domain service as it contains business logic that
//! doesn't naturally fit into a value object.

use schematree_domain::{
    Additional, ArrayRules, CompositionFailureReason, CompositionRules, Constraint, Dependency,
    Items, JsonPath, Keyword, LiteralRules, NumericRules, ObjectRules, SchemaNode, SchemaType,
    SchemaValidationError, SchemaValidationResult, StringRules, TypeSet, values_equal,
};
use serde_json::{Map, Value};

use crate::config::ValidationConfig;

/// Schema validation service
///
/// Validates JSON data against [`SchemaNode`]s. Every constraint family
/// present on the node must hold; absent families impose nothing. The order
/// in which families are checked only affects which error is reported, never
/// whether validation passes.
///
/// Composition keywords are enforced as well: every `allOf` branch, at least
/// one `anyOf` branch, exactly one `oneOf` branch, `not` must fail and `if`
/// selects `then` or `else`.
///
/// # Examples
/// ```
/// # use schematree::domain::services::ValidationService;
/// # use schematree_domain::{JsonPath, SchemaNode};
/// # use serde_json::json;
/// let validator = ValidationService::new();
/// let schema = SchemaNode::parse(&json!({"type": "integer", "minimum": 0, "maximum": 100})).unwrap();
///
/// assert!(validator.validate(&json!(50), &schema, &JsonPath::root()).is_ok());
/// assert!(validator.validate(&json!(101), &schema, &JsonPath::root()).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ValidationService {
    /// Maximum validation depth to prevent stack overflow
    max_depth: usize,
    /// Absolute tolerance for the `multipleOf` remainder
    multiple_of_tolerance: f64,
}

impl ValidationService {
    /// Create a new validation service with default configuration
    pub fn new() -> Self {
        Self::from_config(&ValidationConfig::default())
    }

    /// Create validation service with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    /// Create validation service from configuration
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            multiple_of_tolerance: config.multiple_of_tolerance,
        }
    }

    /// Configured maximum depth
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Validate JSON data against a schema
    ///
    /// # Arguments
    /// * `data` - JSON data to validate
    /// * `schema` - Schema to validate against
    /// * `path` - Location of `data`, used in error reports
    ///
    /// # Errors
    /// Returns `SchemaValidationError` naming the violated keyword, the
    /// offending value and its path.
    pub fn validate(
        &self,
        data: &Value,
        schema: &SchemaNode,
        path: &JsonPath,
    ) -> SchemaValidationResult<()> {
        self.validate_with_depth(data, schema, path, 0)
    }

    /// Whether data satisfies a schema, with no error detail
    pub fn is_valid(&self, data: &Value, schema: &SchemaNode) -> bool {
        self.validate(data, schema, &JsonPath::root()).is_ok()
    }

    fn matches(&self, data: &Value, schema: &SchemaNode, path: &JsonPath, depth: usize) -> bool {
        self.validate_with_depth(data, schema, path, depth).is_ok()
    }

    fn validate_with_depth(
        &self,
        data: &Value,
        schema: &SchemaNode,
        path: &JsonPath,
        depth: usize,
    ) -> SchemaValidationResult<()> {
        if depth > self.max_depth {
            return Err(SchemaValidationError::DepthExceeded {
                path: path.clone(),
                max_depth: self.max_depth,
            });
        }

        for constraint in schema.constraints() {
            match constraint {
                Constraint::Reject => {
                    return Err(SchemaValidationError::constraint(
                        path,
                        Keyword::FalseSchema,
                        data,
                        "schema 'false' rejects every value",
                    ));
                }
                Constraint::Type(types) => self.validate_type(data, *types, path)?,
                Constraint::Numeric(rules) => self.validate_numeric(data, rules, path)?,
                Constraint::String(rules) => self.validate_string(data, rules, path)?,
                Constraint::Array(rules) => self.validate_array(data, rules, path, depth)?,
                Constraint::Object(rules) => self.validate_object(data, rules, path, depth)?,
                Constraint::Literal(rules) => self.validate_literal(data, rules, path)?,
            }
        }

        self.validate_composition(data, schema.composition(), path, depth)
    }

    fn validate_type(
        &self,
        data: &Value,
        types: TypeSet,
        path: &JsonPath,
    ) -> SchemaValidationResult<()> {
        if types.matches(data) {
            return Ok(());
        }
        Err(SchemaValidationError::TypeMismatch {
            path: path.clone(),
            expected: types,
            actual: SchemaType::of(data),
            value: data.clone(),
        })
    }

    fn validate_numeric(
        &self,
        data: &Value,
        rules: &NumericRules,
        path: &JsonPath,
    ) -> SchemaValidationResult<()> {
        let Some(value) = data.as_f64() else {
            return Ok(());
        };

        if let Some(min) = rules.minimum
            && value < min
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Minimum,
                data,
                format!("{data} is less than minimum {min}"),
            ));
        }

        if let Some(max) = rules.maximum
            && value > max
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Maximum,
                data,
                format!("{data} is greater than maximum {max}"),
            ));
        }

        if let Some(min) = rules.exclusive_minimum
            && value <= min
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::ExclusiveMinimum,
                data,
                format!("{data} must be greater than {min}"),
            ));
        }

        if let Some(max) = rules.exclusive_maximum
            && value >= max
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::ExclusiveMaximum,
                data,
                format!("{data} must be less than {max}"),
            ));
        }

        if let Some(step) = rules.multiple_of {
            let remainder = value - (value / step).round() * step;
            if remainder.abs() > self.multiple_of_tolerance {
                return Err(SchemaValidationError::constraint(
                    path,
                    Keyword::MultipleOf,
                    data,
                    format!("{data} is not a multiple of {step}"),
                ));
            }
        }

        Ok(())
    }

    fn validate_string(
        &self,
        data: &Value,
        rules: &StringRules,
        path: &JsonPath,
    ) -> SchemaValidationResult<()> {
        let Value::String(value) = data else {
            return Ok(());
        };

        let len = value.chars().count();

        if let Some(min) = rules.min_length
            && len < min
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MinLength,
                data,
                format!("length {len} is shorter than {min}"),
            ));
        }

        if let Some(max) = rules.max_length
            && len > max
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MaxLength,
                data,
                format!("length {len} is longer than {max}"),
            ));
        }

        if let Some(pattern) = &rules.pattern
            && !pattern.is_match(value)
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Pattern,
                data,
                format!("does not match pattern '{}'", pattern.as_str()),
            ));
        }

        Ok(())
    }

    fn validate_array(
        &self,
        data: &Value,
        rules: &ArrayRules,
        path: &JsonPath,
        depth: usize,
    ) -> SchemaValidationResult<()> {
        let Value::Array(items) = data else {
            return Ok(());
        };

        let len = items.len();

        if let Some(min) = rules.min_items
            && len < min
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MinItems,
                data,
                format!("{len} items, at least {min} required"),
            ));
        }

        if let Some(max) = rules.max_items
            && len > max
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MaxItems,
                data,
                format!("{len} items, at most {max} allowed"),
            ));
        }

        if rules.unique_items {
            for (i, item) in items.iter().enumerate() {
                if let Some(j) = items[..i].iter().position(|seen| values_equal(seen, item)) {
                    return Err(SchemaValidationError::constraint(
                        path,
                        Keyword::UniqueItems,
                        data,
                        format!("items {j} and {i} are equal"),
                    ));
                }
            }
        }

        match &rules.items {
            Some(Items::Single(schema)) => {
                for (i, item) in items.iter().enumerate() {
                    self.validate_with_depth(item, schema, &path.append_index(i), depth + 1)?;
                }
            }
            Some(Items::Positional(schemas)) => {
                for (i, (item, schema)) in items.iter().zip(schemas).enumerate() {
                    self.validate_with_depth(item, schema, &path.append_index(i), depth + 1)?;
                }
            }
            None => {}
        }

        if let Some(schema) = &rules.contains {
            let found = items
                .iter()
                .enumerate()
                .any(|(i, item)| self.matches(item, schema, &path.append_index(i), depth + 1));
            if !found {
                return Err(SchemaValidationError::constraint(
                    path,
                    Keyword::Contains,
                    data,
                    "no item matches the 'contains' schema",
                ));
            }
        }

        Ok(())
    }

    fn validate_object(
        &self,
        data: &Value,
        rules: &ObjectRules,
        path: &JsonPath,
        depth: usize,
    ) -> SchemaValidationResult<()> {
        let Value::Object(object) = data else {
            return Ok(());
        };

        for field in &rules.required {
            if !object.contains_key(field) {
                return Err(SchemaValidationError::constraint(
                    path,
                    Keyword::Required,
                    data,
                    format!("missing required property '{field}'"),
                ));
            }
        }

        let count = object.len();

        if let Some(min) = rules.min_properties
            && count < min
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MinProperties,
                data,
                format!("{count} properties, at least {min} required"),
            ));
        }

        if let Some(max) = rules.max_properties
            && count > max
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::MaxProperties,
                data,
                format!("{count} properties, at most {max} allowed"),
            ));
        }

        for (name, schema) in &rules.properties {
            if let Some(value) = object.get(name) {
                self.validate_with_depth(value, schema, &path.append_key(name), depth + 1)?;
            }
        }

        for (key, value) in object {
            for (pattern, schema) in &rules.pattern_properties {
                if pattern.is_match(key) {
                    self.validate_with_depth(value, schema, &path.append_key(key), depth + 1)?;
                }
            }
        }

        if let Some(additional) = &rules.additional_properties {
            self.validate_additional(object, additional, rules, path, depth)?;
        }

        for (trigger, dependency) in &rules.dependencies {
            if !object.contains_key(trigger) {
                continue;
            }
            match dependency {
                Dependency::Required(keys) => {
                    if let Some(missing) = keys.iter().find(|key| !object.contains_key(*key)) {
                        return Err(SchemaValidationError::constraint(
                            path,
                            Keyword::Dependencies,
                            data,
                            format!("property '{trigger}' requires property '{missing}'"),
                        ));
                    }
                }
                Dependency::Schema(schema) => {
                    self.validate_with_depth(data, schema, path, depth + 1)?;
                }
            }
        }

        Ok(())
    }

    fn validate_additional(
        &self,
        object: &Map<String, Value>,
        additional: &Additional,
        rules: &ObjectRules,
        path: &JsonPath,
        depth: usize,
    ) -> SchemaValidationResult<()> {
        for (key, value) in object {
            if rules.is_declared(key) {
                continue;
            }
            match additional {
                Additional::Forbidden => {
                    return Err(SchemaValidationError::constraint(
                        &path.append_key(key),
                        Keyword::AdditionalProperties,
                        value,
                        format!("additional property '{key}' is not allowed"),
                    ));
                }
                Additional::Schema(schema) => {
                    self.validate_with_depth(value, schema, &path.append_key(key), depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn validate_literal(
        &self,
        data: &Value,
        rules: &LiteralRules,
        path: &JsonPath,
    ) -> SchemaValidationResult<()> {
        if let Some(allowed) = &rules.enum_values
            && !allowed.iter().any(|candidate| values_equal(candidate, data))
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Enum,
                data,
                format!("{data} is not one of the allowed values"),
            ));
        }

        if let Some(expected) = &rules.const_value
            && !values_equal(expected, data)
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Const,
                data,
                format!("{data} does not equal {expected}"),
            ));
        }

        Ok(())
    }

    fn validate_composition(
        &self,
        data: &Value,
        rules: &CompositionRules,
        path: &JsonPath,
        depth: usize,
    ) -> SchemaValidationResult<()> {
        for branch in &rules.all_of {
            self.validate_with_depth(data, branch, path, depth + 1)?;
        }

        if !rules.any_of.is_empty()
            && !rules
                .any_of
                .iter()
                .any(|branch| self.matches(data, branch, path, depth + 1))
        {
            return Err(SchemaValidationError::composition(
                path,
                Keyword::AnyOf,
                CompositionFailureReason::NoMatch,
            ));
        }

        if !rules.one_of.is_empty() {
            let count = rules
                .one_of
                .iter()
                .filter(|branch| self.matches(data, branch, path, depth + 1))
                .count();
            match count {
                1 => {}
                0 => {
                    return Err(SchemaValidationError::composition(
                        path,
                        Keyword::OneOf,
                        CompositionFailureReason::NoMatch,
                    ));
                }
                count => {
                    return Err(SchemaValidationError::composition(
                        path,
                        Keyword::OneOf,
                        CompositionFailureReason::MultipleMatches { count },
                    ));
                }
            }
        }

        if let Some(not) = &rules.not
            && self.matches(data, not, path, depth + 1)
        {
            return Err(SchemaValidationError::constraint(
                path,
                Keyword::Not,
                data,
                "value matches the 'not' schema",
            ));
        }

        if let Some(conditional) = &rules.conditional {
            let branch = if self.matches(data, &conditional.if_schema, path, depth + 1) {
                &conditional.then_schema
            } else {
                &conditional.else_schema
            };
            if let Some(branch) = branch {
                self.validate_with_depth(data, branch, path, depth + 1)?;
            }
        }

        Ok(())
    }
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}
