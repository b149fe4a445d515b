//! Schema keywords and JSON type names
//!
//! [`Keyword`] identifies every recognized schema keyword and is what
//! validation errors report. [`SchemaType`] is the runtime type of a JSON
//! value and [`TypeSet`] the set of types a `type` keyword allows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Recognized schema keywords
///
/// Any keyword not listed here is ignored by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    /// `type`
    Type,
    /// `enum`
    Enum,
    /// `const`
    Const,
    /// `default`
    Default,
    /// `minimum`
    Minimum,
    /// `maximum`
    Maximum,
    /// `exclusiveMinimum`
    ExclusiveMinimum,
    /// `exclusiveMaximum`
    ExclusiveMaximum,
    /// `multipleOf`
    MultipleOf,
    /// `minLength`
    MinLength,
    /// `maxLength`
    MaxLength,
    /// `pattern`
    Pattern,
    /// `minItems`
    MinItems,
    /// `maxItems`
    MaxItems,
    /// `uniqueItems`
    UniqueItems,
    /// `items`
    Items,
    /// `contains`
    Contains,
    /// `required`
    Required,
    /// `minProperties`
    MinProperties,
    /// `maxProperties`
    MaxProperties,
    /// `properties`
    Properties,
    /// `patternProperties`
    PatternProperties,
    /// `additionalProperties`
    AdditionalProperties,
    /// `dependencies` (also `dependentRequired` / `dependentSchemas`)
    Dependencies,
    /// `oneOf`
    OneOf,
    /// `anyOf`
    AnyOf,
    /// `allOf`
    AllOf,
    /// `not`
    Not,
    /// `if`
    If,
    /// `then`
    Then,
    /// `else`
    Else,
    /// The boolean schema `false`
    FalseSchema,
}

impl Keyword {
    /// Keyword name as it appears in a schema document
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Const => "const",
            Self::Default => "default",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::MultipleOf => "multipleOf",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::MinItems => "minItems",
            Self::MaxItems => "maxItems",
            Self::UniqueItems => "uniqueItems",
            Self::Items => "items",
            Self::Contains => "contains",
            Self::Required => "required",
            Self::MinProperties => "minProperties",
            Self::MaxProperties => "maxProperties",
            Self::Properties => "properties",
            Self::PatternProperties => "patternProperties",
            Self::AdditionalProperties => "additionalProperties",
            Self::Dependencies => "dependencies",
            Self::OneOf => "oneOf",
            Self::AnyOf => "anyOf",
            Self::AllOf => "allOf",
            Self::Not => "not",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::FalseSchema => "false",
        }
    }

    /// Look up a keyword by its document name
    ///
    /// `dependentRequired` and `dependentSchemas` map to [`Keyword::Dependencies`].
    pub fn from_name(name: &str) -> Option<Self> {
        let keyword = match name {
            "type" => Self::Type,
            "enum" => Self::Enum,
            "const" => Self::Const,
            "default" => Self::Default,
            "minimum" => Self::Minimum,
            "maximum" => Self::Maximum,
            "exclusiveMinimum" => Self::ExclusiveMinimum,
            "exclusiveMaximum" => Self::ExclusiveMaximum,
            "multipleOf" => Self::MultipleOf,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "minItems" => Self::MinItems,
            "maxItems" => Self::MaxItems,
            "uniqueItems" => Self::UniqueItems,
            "items" => Self::Items,
            "contains" => Self::Contains,
            "required" => Self::Required,
            "minProperties" => Self::MinProperties,
            "maxProperties" => Self::MaxProperties,
            "properties" => Self::Properties,
            "patternProperties" => Self::PatternProperties,
            "additionalProperties" => Self::AdditionalProperties,
            "dependencies" | "dependentRequired" | "dependentSchemas" => Self::Dependencies,
            "oneOf" => Self::OneOf,
            "anyOf" => Self::AnyOf,
            "allOf" => Self::AllOf,
            "not" => Self::Not,
            "if" => Self::If,
            "then" => Self::Then,
            "else" => Self::Else,
            _ => return None,
        };
        Some(keyword)
    }

    /// Whether the keyword combines or selects sub-schemas
    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            Self::OneOf | Self::AnyOf | Self::AllOf | Self::Not | Self::If | Self::Then | Self::Else
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime type of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type
    String,
    /// Integer type
    Integer,
    /// Floating-point number type
    Number,
    /// Boolean type
    Boolean,
    /// Null type
    Null,
    /// Array type
    Array,
    /// Object type
    Object,
}

impl SchemaType {
    /// Type name as used by the `type` keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Parse a `type` keyword entry
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Runtime type of a value
    ///
    /// Numbers stored as integers report `Integer`; every float reports
    /// `Number`, even when integral.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    fn flag(self) -> TypeSet {
        match self {
            Self::String => TypeSet::STRING,
            Self::Integer => TypeSet::INTEGER,
            Self::Number => TypeSet::NUMBER,
            Self::Boolean => TypeSet::BOOLEAN,
            Self::Null => TypeSet::NULL,
            Self::Array => TypeSet::ARRAY,
            Self::Object => TypeSet::OBJECT,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of types allowed by a `type` keyword
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeSet: u8 {
        /// `string`
        const STRING = 1 << 0;
        /// `integer`
        const INTEGER = 1 << 1;
        /// `number` (implies integer)
        const NUMBER = 1 << 2;
        /// `boolean`
        const BOOLEAN = 1 << 3;
        /// `null`
        const NULL = 1 << 4;
        /// `array`
        const ARRAY = 1 << 5;
        /// `object`
        const OBJECT = 1 << 6;
    }
}

const TYPE_ORDER: [SchemaType; 7] = [
    SchemaType::String,
    SchemaType::Integer,
    SchemaType::Number,
    SchemaType::Boolean,
    SchemaType::Null,
    SchemaType::Array,
    SchemaType::Object,
];

impl TypeSet {
    /// Parse the value of a `type` keyword: one name or an array of names
    ///
    /// # Errors
    /// Returns the offending entry when a name is unknown or not a string.
    pub fn from_keyword(value: &Value) -> Result<Self, String> {
        let names: Vec<&Value> = match value {
            Value::Array(items) if !items.is_empty() => items.iter().collect(),
            Value::Array(_) => return Err("type array must not be empty".to_string()),
            other => vec![other],
        };

        let mut set = TypeSet::empty();
        for name in names {
            let parsed = name
                .as_str()
                .and_then(SchemaType::from_name)
                .ok_or_else(|| format!("unknown type name {name}"))?;
            set |= parsed.flag();
        }
        Ok(set)
    }

    /// Whether a value's runtime type is allowed
    ///
    /// Booleans never satisfy `integer` or `number`. An integral float
    /// satisfies `integer`.
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.contains(Self::NULL),
            Value::Bool(_) => self.contains(Self::BOOLEAN),
            Value::String(_) => self.contains(Self::STRING),
            Value::Array(_) => self.contains(Self::ARRAY),
            Value::Object(_) => self.contains(Self::OBJECT),
            Value::Number(n) => {
                if self.contains(Self::NUMBER) {
                    return true;
                }
                self.contains(Self::INTEGER)
                    && (n.is_i64()
                        || n.is_u64()
                        || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0))
            }
        }
    }

    /// Intersect two type sets, honoring `number` as a superset of `integer`
    pub fn intersect(self, other: Self) -> Self {
        let widen = |set: Self| {
            if set.contains(Self::NUMBER) {
                set | Self::INTEGER
            } else {
                set
            }
        };
        let mut result = widen(self) & widen(other);
        if result.contains(Self::NUMBER) {
            result.remove(Self::INTEGER);
        }
        result
    }

    /// Allowed types in declaration order
    pub fn types(&self) -> impl Iterator<Item = SchemaType> + '_ {
        TYPE_ORDER.iter().copied().filter(|t| self.contains(t.flag()))
    }

    /// Render back to a `type` keyword value
    pub fn to_keyword(&self) -> Value {
        let names: Vec<Value> = self.types().map(|t| Value::from(t.as_str())).collect();
        match names.len() {
            1 => names.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Array(names),
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.types().map(|t| t.as_str()).collect();
        f.write_str(&names.join(" or "))
    }
}
