//! Single parsing pass from a raw schema document to a [`SchemaNode`]

use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;

use super::keyword::{Keyword, TypeSet};
use super::schema::{
    Additional, ArrayRules, CompositionRules, Conditional, Constraint, Dependency, Items,
    LiteralRules, NumericRules, ObjectRules, Pattern, SchemaError, SchemaNode, SchemaResult,
    StringRules,
};

pub(super) fn parse_node(raw: &Value, pointer: &str) -> SchemaResult<SchemaNode> {
    let map = match raw {
        Value::Bool(allowed) => {
            let mut constraints = SmallVec::new();
            if !allowed {
                constraints.push(Constraint::Reject);
            }
            return Ok(SchemaNode {
                raw: raw.clone(),
                constraints,
                default: None,
                composition: CompositionRules::default(),
            });
        }
        Value::Object(map) => map,
        other => {
            return Err(SchemaError::NotASchema {
                pointer: pointer.to_string(),
                found: type_label(other).to_string(),
            });
        }
    };

    let cx = Cx { map, pointer };
    let mut constraints: SmallVec<[Constraint; 4]> = SmallVec::new();

    if let Some(value) = map.get("type") {
        let types = TypeSet::from_keyword(value).map_err(|message| cx.invalid(Keyword::Type, message))?;
        constraints.push(Constraint::Type(types));
    }

    let numeric = NumericRules {
        minimum: cx.number(Keyword::Minimum)?,
        maximum: cx.number(Keyword::Maximum)?,
        exclusive_minimum: cx.number(Keyword::ExclusiveMinimum)?,
        exclusive_maximum: cx.number(Keyword::ExclusiveMaximum)?,
        multiple_of: cx.number(Keyword::MultipleOf)?,
    };
    if numeric.multiple_of.is_some_and(|m| m <= 0.0) {
        return Err(cx.invalid(Keyword::MultipleOf, "must be strictly greater than 0"));
    }
    if numeric != NumericRules::default() {
        constraints.push(Constraint::Numeric(numeric));
    }

    let string = StringRules {
        min_length: cx.count(Keyword::MinLength)?,
        max_length: cx.count(Keyword::MaxLength)?,
        pattern: match map.get("pattern") {
            None => None,
            Some(Value::String(source)) => Some(cx.pattern(source)?),
            Some(_) => return Err(cx.invalid(Keyword::Pattern, "must be a string")),
        },
    };
    if string != StringRules::default() {
        constraints.push(Constraint::String(string));
    }

    let array = ArrayRules {
        min_items: cx.count(Keyword::MinItems)?,
        max_items: cx.count(Keyword::MaxItems)?,
        unique_items: cx.flag(Keyword::UniqueItems)?,
        items: match map.get("items") {
            None => None,
            Some(Value::Array(schemas)) => Some(Items::Positional(
                schemas
                    .iter()
                    .enumerate()
                    .map(|(i, s)| cx.child(s, &format!("items/{i}")))
                    .collect::<SchemaResult<_>>()?,
            )),
            Some(schema) => Some(Items::Single(cx.child(schema, "items")?)),
        },
        contains: cx.optional_child("contains")?,
    };
    if array != ArrayRules::default() {
        constraints.push(Constraint::Array(array));
    }

    let object = ObjectRules {
        properties: cx
            .members(Keyword::Properties, "properties")?
            .into_iter()
            .map(|(name, value)| {
                let child = cx.child(value, &format!("properties/{}", escape_pointer(name)))?;
                Ok((name.clone(), child))
            })
            .collect::<SchemaResult<_>>()?,
        pattern_properties: cx
            .members(Keyword::PatternProperties, "patternProperties")?
            .into_iter()
            .map(|(source, value)| {
                let pointer = format!("patternProperties/{}", escape_pointer(source));
                Ok((cx.pattern(source)?, cx.child(value, &pointer)?))
            })
            .collect::<SchemaResult<_>>()?,
        additional_properties: match map.get("additionalProperties") {
            None | Some(Value::Bool(true)) => None,
            Some(Value::Bool(false)) => Some(Additional::Forbidden),
            Some(schema) => Some(Additional::Schema(cx.child(schema, "additionalProperties")?)),
        },
        required: cx.strings(Keyword::Required, map.get("required"))?,
        min_properties: cx.count(Keyword::MinProperties)?,
        max_properties: cx.count(Keyword::MaxProperties)?,
        dependencies: cx.dependencies()?,
    };
    if object != ObjectRules::default() {
        constraints.push(Constraint::Object(object));
    }

    let literal = LiteralRules {
        enum_values: match map.get("enum") {
            None => None,
            Some(Value::Array(values)) => Some(values.clone()),
            Some(_) => return Err(cx.invalid(Keyword::Enum, "must be an array")),
        },
        const_value: map.get("const").cloned(),
    };
    if literal != LiteralRules::default() {
        constraints.push(Constraint::Literal(literal));
    }

    let composition = CompositionRules {
        one_of: cx.branches(Keyword::OneOf)?,
        any_of: cx.branches(Keyword::AnyOf)?,
        all_of: cx.branches(Keyword::AllOf)?,
        not: cx.optional_child("not")?,
        conditional: match cx.optional_child("if")? {
            Some(if_schema) => Some(Conditional {
                if_schema,
                then_schema: cx.optional_child("then")?,
                else_schema: cx.optional_child("else")?,
            }),
            None => None,
        },
    };

    Ok(SchemaNode {
        raw: raw.clone(),
        constraints,
        default: map.get("default").cloned(),
        composition,
    })
}

struct Cx<'a> {
    map: &'a Map<String, Value>,
    pointer: &'a str,
}

impl<'a> Cx<'a> {
    fn invalid(&self, keyword: Keyword, message: impl Into<String>) -> SchemaError {
        SchemaError::InvalidKeyword {
            pointer: self.pointer.to_string(),
            keyword,
            message: message.into(),
        }
    }

    fn child(&self, raw: &Value, suffix: &str) -> SchemaResult<Arc<SchemaNode>> {
        parse_node(raw, &format!("{}/{suffix}", self.pointer)).map(Arc::new)
    }

    fn optional_child(&self, name: &str) -> SchemaResult<Option<Arc<SchemaNode>>> {
        self.map
            .get(name)
            .map(|raw| self.child(raw, name))
            .transpose()
    }

    fn number(&self, keyword: Keyword) -> SchemaResult<Option<f64>> {
        match self.map.get(keyword.as_str()) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(_) => Err(self.invalid(keyword, "must be a number")),
        }
    }

    fn count(&self, keyword: Keyword) -> SchemaResult<Option<usize>> {
        match self.map.get(keyword.as_str()) {
            None => Ok(None),
            Some(Value::Number(n)) => {
                if let Some(count) = n.as_u64() {
                    return Ok(Some(count as usize));
                }
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as usize)),
                    _ => Err(self.invalid(keyword, "must be a non-negative integer")),
                }
            }
            Some(_) => Err(self.invalid(keyword, "must be a non-negative integer")),
        }
    }

    fn flag(&self, keyword: Keyword) -> SchemaResult<bool> {
        match self.map.get(keyword.as_str()) {
            None => Ok(false),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(_) => Err(self.invalid(keyword, "must be a boolean")),
        }
    }

    fn pattern(&self, source: &str) -> SchemaResult<Pattern> {
        Pattern::new(source).map_err(|e| SchemaError::InvalidPattern {
            pointer: self.pointer.to_string(),
            pattern: source.to_string(),
            message: e.to_string(),
        })
    }

    fn strings(&self, keyword: Keyword, value: Option<&Value>) -> SchemaResult<Vec<String>> {
        match value {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(keyword, "must be an array of strings"))
                })
                .collect(),
            Some(_) => Err(self.invalid(keyword, "must be an array of strings")),
        }
    }

    fn members(&self, keyword: Keyword, name: &str) -> SchemaResult<Vec<(&'a String, &'a Value)>> {
        match self.map.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Object(members)) => Ok(members.iter().collect()),
            Some(_) => Err(self.invalid(keyword, "must be an object")),
        }
    }

    fn branches(&self, keyword: Keyword) -> SchemaResult<Vec<Arc<SchemaNode>>> {
        let name = keyword.as_str();
        match self.map.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(schemas)) if !schemas.is_empty() => schemas
                .iter()
                .enumerate()
                .map(|(i, raw)| self.child(raw, &format!("{name}/{i}")))
                .collect(),
            Some(_) => Err(self.invalid(keyword, "must be a non-empty array of schemas")),
        }
    }

    fn dependencies(&self) -> SchemaResult<Vec<(String, Dependency)>> {
        let mut dependencies = Vec::new();
        for name in ["dependencies", "dependentRequired", "dependentSchemas"] {
            for (trigger, value) in self.members(Keyword::Dependencies, name)? {
                let dependency = match (name, value) {
                    ("dependentSchemas", _) | ("dependencies", Value::Object(_) | Value::Bool(_)) => {
                        let pointer = format!("{name}/{}", escape_pointer(trigger));
                        Dependency::Schema(self.child(value, &pointer)?)
                    }
                    (_, Value::Array(_)) => {
                        Dependency::Required(self.strings(Keyword::Dependencies, Some(value))?)
                    }
                    _ => {
                        return Err(self.invalid(
                            Keyword::Dependencies,
                            format!("entry '{trigger}' must be an array of keys or a schema"),
                        ));
                    }
                };
                dependencies.push((trigger.clone(), dependency));
            }
        }
        Ok(dependencies)
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::SchemaType;
    use serde_json::json;

    #[test]
    fn test_parse_families() {
        let node = parse_node(
            &json!({
                "type": "integer",
                "minimum": 0,
                "maxLength": 3,
                "minItems": 1,
                "required": ["a"],
                "enum": [1, 2]
            }),
            "#",
        )
        .unwrap();

        assert_eq!(node.types(), Some(TypeSet::INTEGER));
        assert_eq!(node.numeric().unwrap().minimum, Some(0.0));
        assert_eq!(node.string().unwrap().max_length, Some(3));
        assert_eq!(node.array().unwrap().min_items, Some(1));
        assert_eq!(node.object().unwrap().required, vec!["a".to_string()]);
        assert_eq!(node.literal().unwrap().enum_values, Some(vec![json!(1), json!(2)]));
        assert_eq!(node.constraints().len(), 6);
    }

    #[test]
    fn test_unknown_keywords_ignored() {
        let node = parse_node(&json!({"$ref": "#/x", "title": "t", "x-custom": [1]}), "#").unwrap();
        assert!(node.is_unconstrained());
    }

    #[test]
    fn test_false_schema_rejects() {
        let node = parse_node(&json!(false), "#").unwrap();
        assert!(node.rejects_all());
        assert!(!parse_node(&json!(true), "#").unwrap().rejects_all());
    }

    #[test]
    fn test_not_a_schema() {
        let err = parse_node(&json!({"properties": {"a": 5}}), "#").unwrap_err();
        assert_eq!(
            err,
            SchemaError::NotASchema {
                pointer: "#/properties/a".to_string(),
                found: "number".to_string(),
            }
        );
    }

    #[test]
    fn test_composition_must_hold_schemas() {
        let err = parse_node(&json!({"oneOf": {"type": "string"}}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyword { keyword: Keyword::OneOf, .. }));

        let err = parse_node(&json!({"anyOf": [1]}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::NotASchema { ref pointer, .. } if pointer == "#/anyOf/0"));

        let err = parse_node(&json!({"allOf": []}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyword { keyword: Keyword::AllOf, .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = parse_node(&json!({"pattern": "(unclosed"}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));

        let err = parse_node(&json!({"patternProperties": {"[": {}}}), "#").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { ref pattern, .. } if pattern == "["));
    }

    #[test]
    fn test_malformed_bounds() {
        assert!(parse_node(&json!({"minLength": -1}), "#").is_err());
        assert!(parse_node(&json!({"minimum": "0"}), "#").is_err());
        assert!(parse_node(&json!({"multipleOf": 0}), "#").is_err());
        assert!(parse_node(&json!({"uniqueItems": "yes"}), "#").is_err());
        assert!(parse_node(&json!({"type": "decimal"}), "#").is_err());
    }

    #[test]
    fn test_dependencies_forms() {
        let node = parse_node(
            &json!({
                "dependencies": {
                    "credit_card": ["billing_address"],
                    "name": {"required": ["age"]}
                },
                "dependentRequired": {"a": ["b"]}
            }),
            "#",
        )
        .unwrap();
        let deps = &node.object().unwrap().dependencies;
        assert_eq!(deps.len(), 3);
        assert!(matches!(deps[0].1, Dependency::Required(ref keys) if keys == &["billing_address"]));
        assert!(matches!(deps[1].1, Dependency::Schema(_)));
        assert!(matches!(deps[2].1, Dependency::Required(_)));
    }

    #[test]
    fn test_conditional_requires_if() {
        let node = parse_node(&json!({"then": {"type": "string"}}), "#").unwrap();
        assert!(node.composition().conditional.is_none());

        let node = parse_node(
            &json!({"if": {"type": "string"}, "else": {"type": "null"}}),
            "#",
        )
        .unwrap();
        let conditional = node.composition().conditional.as_ref().unwrap();
        assert!(conditional.then_schema.is_none());
        assert_eq!(
            conditional.else_schema.as_ref().unwrap().types().unwrap().types().next(),
            Some(SchemaType::Null)
        );
    }
}
