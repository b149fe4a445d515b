//! Comprehensive tests for the SchemaNode value object
//!
//! Tests cover parsing of every constraint family, child schema lookup,
//! composition keywords, allOf merging and error reporting.

use schematree_domain::value_objects::{
    Additional, Dependency, Items, JsonPath, Keyword, SchemaError, SchemaNode, SchemaType,
    SchemaValidationError, TypeSet, merge_schemas, values_equal,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn parse(raw: Value) -> SchemaNode {
    SchemaNode::parse(&raw).expect("schema should parse")
}

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_parse_empty_object_is_unconstrained() {
    let node = parse(json!({}));
    assert!(node.is_unconstrained());
    assert!(node.types().is_none());
    assert!(node.default_value().is_none());
}

#[test]
fn test_parse_keeps_raw_document() {
    let raw = json!({"type": "string", "title": "Name", "default": "anon"});
    let node = parse(raw.clone());
    assert_eq!(node.raw(), &raw);
    assert_eq!(node.default_value(), Some(&json!("anon")));
}

#[test]
fn test_parse_type_union() {
    let node = parse(json!({"type": ["string", "null"]}));
    let types = node.types().unwrap();
    assert!(types.contains(TypeSet::STRING));
    assert!(types.contains(TypeSet::NULL));
    assert!(!types.contains(TypeSet::INTEGER));
}

#[test]
fn test_parse_numeric_rules() {
    let node = parse(json!({
        "minimum": 1,
        "maximum": 10.5,
        "exclusiveMinimum": 0,
        "exclusiveMaximum": 11,
        "multipleOf": 0.5
    }));
    let rules = node.numeric().unwrap();
    assert_eq!(rules.minimum, Some(1.0));
    assert_eq!(rules.maximum, Some(10.5));
    assert_eq!(rules.exclusive_minimum, Some(0.0));
    assert_eq!(rules.exclusive_maximum, Some(11.0));
    assert_eq!(rules.multiple_of, Some(0.5));
}

#[test]
fn test_parse_string_rules() {
    let node = parse(json!({"minLength": 1, "maxLength": 8, "pattern": "^[a-z]+$"}));
    let rules = node.string().unwrap();
    assert_eq!(rules.min_length, Some(1));
    assert_eq!(rules.max_length, Some(8));
    let pattern = rules.pattern.as_ref().unwrap();
    assert_eq!(pattern.as_str(), "^[a-z]+$");
    assert!(pattern.is_match("abc"));
    assert!(!pattern.is_match("Abc"));
}

#[test]
fn test_pattern_is_unanchored_search() {
    let node = parse(json!({"pattern": "b"}));
    assert!(node.string().unwrap().pattern.as_ref().unwrap().is_match("abc"));
}

#[test]
fn test_parse_array_rules() {
    let node = parse(json!({
        "minItems": 1,
        "maxItems": 3,
        "uniqueItems": true,
        "items": {"type": "integer"},
        "contains": {"const": 7}
    }));
    let rules = node.array().unwrap();
    assert_eq!(rules.min_items, Some(1));
    assert_eq!(rules.max_items, Some(3));
    assert!(rules.unique_items);
    assert!(matches!(rules.items, Some(Items::Single(_))));
    assert!(rules.contains.is_some());
}

#[test]
fn test_parse_object_rules() {
    let node = parse(json!({
        "properties": {"name": {"type": "string"}},
        "patternProperties": {"^x-": {"type": "string"}},
        "additionalProperties": false,
        "required": ["name"],
        "minProperties": 1,
        "maxProperties": 4
    }));
    let rules = node.object().unwrap();
    assert_eq!(rules.properties.len(), 1);
    assert_eq!(rules.pattern_properties.len(), 1);
    assert_eq!(rules.additional_properties, Some(Additional::Forbidden));
    assert_eq!(rules.required, vec!["name".to_string()]);
    assert_eq!(rules.min_properties, Some(1));
    assert_eq!(rules.max_properties, Some(4));
    assert!(rules.is_declared("name"));
    assert!(rules.is_declared("x-trace"));
    assert!(!rules.is_declared("other"));
}

#[test]
fn test_additional_properties_true_is_no_rule() {
    let node = parse(json!({"additionalProperties": true}));
    assert!(node.object().is_none());
}

#[test]
fn test_parse_literal_rules() {
    let node = parse(json!({"enum": ["a", "b"], "const": "a"}));
    let rules = node.literal().unwrap();
    assert_eq!(rules.enum_values, Some(vec![json!("a"), json!("b")]));
    assert_eq!(rules.const_value, Some(json!("a")));
}

#[test]
fn test_const_null_is_a_constraint() {
    let node = parse(json!({"const": null}));
    assert_eq!(node.literal().unwrap().const_value, Some(Value::Null));
}

#[test]
fn test_parse_dependent_schemas() {
    let node = parse(json!({"dependentSchemas": {"card": {"required": ["billing"]}}}));
    let (trigger, dependency) = &node.object().unwrap().dependencies[0];
    assert_eq!(trigger, "card");
    match dependency {
        Dependency::Schema(schema) => {
            assert_eq!(schema.object().unwrap().required, vec!["billing".to_string()]);
        }
        Dependency::Required(_) => panic!("expected a schema dependency"),
    }
}

// ============================================================================
// Child Schema Tests
// ============================================================================

#[test]
fn test_child_for_key_prefers_properties() {
    let node = parse(json!({
        "properties": {"S_id": {"type": "integer"}},
        "patternProperties": {"^S_": {"type": "string"}}
    }));
    assert_eq!(node.child_for_key("S_id").unwrap().types(), Some(TypeSet::INTEGER));
    assert_eq!(node.child_for_key("S_name").unwrap().types(), Some(TypeSet::STRING));
    assert!(node.child_for_key("name").is_none());
}

#[test]
fn test_first_matching_pattern_wins() {
    let node = parse(json!({
        "patternProperties": {
            "^a": {"type": "string"},
            "^ab": {"type": "integer"}
        }
    }));
    assert_eq!(node.child_for_key("abc").unwrap().types(), Some(TypeSet::STRING));
}

#[test]
fn test_child_for_path_segment() {
    let node = parse(json!({
        "properties": {"tags": {"items": {"type": "string"}}}
    }));
    let path = JsonPath::parse("$.tags[3]").unwrap();
    let tags = node.child_for(&path.segments()[0]).unwrap();
    let element = tags.child_for(&path.segments()[1]).unwrap();
    assert_eq!(element.types(), Some(TypeSet::STRING));
}

#[test]
fn test_children_are_shared() {
    let node = parse(json!({"properties": {"a": {"type": "string"}}}));
    let first = Arc::clone(node.child_for_key("a").unwrap());
    let second = Arc::clone(node.child_for_key("a").unwrap());
    assert!(Arc::ptr_eq(&first, &second));
}

// ============================================================================
// Composition Tests
// ============================================================================

#[test]
fn test_composition_branches_parsed() {
    let node = parse(json!({
        "oneOf": [{"type": "string"}, {"type": "integer"}],
        "anyOf": [{"minimum": 0}],
        "not": {"const": 0},
        "if": {"properties": {"role": {"const": "admin"}}},
        "then": {"required": ["permissions"]}
    }));
    let rules = node.composition();
    assert_eq!(rules.one_of.len(), 2);
    assert_eq!(rules.any_of.len(), 1);
    assert!(rules.all_of.is_empty());
    assert!(rules.not.is_some());
    let conditional = rules.conditional.as_ref().unwrap();
    assert!(conditional.then_schema.is_some());
    assert!(conditional.else_schema.is_none());
    assert!(node.has_composition());
}

#[test]
fn test_effective_schema_merges_all_of() {
    let node = SchemaNode::shared(&json!({
        "type": "object",
        "allOf": [
            {"properties": {"name": {"type": "string"}}, "required": ["name"]},
            {"properties": {"age": {"type": "integer"}}, "required": ["age"]}
        ]
    }))
    .unwrap();
    let effective = node.effective().unwrap();
    let required = &effective.object().unwrap().required;
    assert!(required.contains(&"name".to_string()));
    assert!(required.contains(&"age".to_string()));
    assert!(effective.child_for_key("age").is_some());
}

#[test]
fn test_effective_schema_conflict() {
    let node = SchemaNode::shared(&json!({
        "allOf": [{"type": "string"}, {"type": "object"}]
    }))
    .unwrap();
    let err = node.effective().unwrap_err();
    assert!(matches!(err, SchemaError::MergeConflict { keyword: Keyword::Type, .. }));
}

#[test]
fn test_merge_schemas_left_to_right() {
    let merged = merge_schemas(&[
        &json!({"default": 1, "maximum": 10}),
        &json!({"default": 2, "maximum": 5}),
    ])
    .unwrap();
    assert_eq!(merged, json!({"default": 2, "maximum": 5}));
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_schema_error_pointer() {
    let err = SchemaNode::parse(&json!({
        "properties": {"a/b": {"minLength": "short"}}
    }))
    .unwrap_err();
    match err {
        SchemaError::InvalidKeyword { pointer, keyword, .. } => {
            assert_eq!(pointer, "#/properties/a~1b");
            assert_eq!(keyword, Keyword::MinLength);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_schema_rejects_non_schema_root() {
    assert!(matches!(
        SchemaNode::parse(&json!("string")),
        Err(SchemaError::NotASchema { .. })
    ));
    assert!(SchemaNode::try_from(&json!([])).is_err());
}

#[test]
fn test_type_mismatch_display() {
    let err = SchemaValidationError::TypeMismatch {
        path: JsonPath::root().append_key("age"),
        expected: TypeSet::INTEGER,
        actual: SchemaType::String,
        value: json!("thirty"),
    };
    assert_eq!(
        err.to_string(),
        "Type mismatch at '$.age': expected integer, got string (\"thirty\")"
    );
    assert_eq!(err.keyword(), Some(Keyword::Type));
}

#[test]
fn test_depth_exceeded_has_no_value() {
    let err = SchemaValidationError::DepthExceeded {
        path: JsonPath::root(),
        max_depth: 64,
    };
    assert!(err.value().is_none());
    assert!(err.keyword().is_none());
}

// ============================================================================
// Equality Tests
// ============================================================================

#[test]
fn test_values_equal_numeric() {
    assert!(values_equal(&json!({"n": [1, 2]}), &json!({"n": [1.0, 2.0]})));
    assert!(!values_equal(&json!(1), &json!("1")));
}
