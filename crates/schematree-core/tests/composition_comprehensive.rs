//! Comprehensive tests for composition keywords on live trees
//!
//! Tests cover oneOf selection, anyOf branch lists, allOf merging,
//! if/then/else, not, contains and projection.

use schematree::prelude::*;
use schematree::{Keyword, domain::value_objects::CompositionFailureReason};
use serde_json::{Value, json};

fn bound(data: Value, schema: Value) -> ValidatingNode {
    ValidatingNode::with_schema(data, &schema).expect("schema should parse")
}

fn failure_reason(err: Error) -> CompositionFailureReason {
    match err {
        Error::Validation(SchemaValidationError::CompositionFailure { reason, .. }) => reason,
        other => panic!("expected a composition failure, got {other:?}"),
    }
}

fn account_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "oneOf": [
            {
                "properties": {
                    "type": {"const": "user"},
                    "name": {"type": "string"}
                },
                "required": ["name"]
            },
            {
                "properties": {
                    "type": {"const": "bot"},
                    "token": {"type": "string"}
                },
                "required": ["token"]
            }
        ]
    })
}

// ============================================================================
// oneOf Tests
// ============================================================================

#[test]
fn test_one_of_selects_discriminated_branch() {
    let account = bound(json!({"type": "user", "name": "Alice"}), account_schema());
    let user = account.one_of().unwrap();

    let schema = user.schema().unwrap();
    assert!(schema.object().unwrap().property("name").is_some());
    assert!(schema.object().unwrap().required.contains(&"type".to_string()));

    assert!(user.write("name", json!(5)).is_err());
    user.write("name", json!("Bob")).unwrap();
}

#[test]
fn test_one_of_no_match() {
    let account = bound(json!({"type": "robot"}), account_schema());
    assert_eq!(failure_reason(account.one_of().unwrap_err()), CompositionFailureReason::NoMatch);
}

#[test]
fn test_one_of_multiple_matches() {
    let node = bound(
        json!({"id": 1}),
        json!({"oneOf": [{"required": ["id"]}, {"properties": {"id": {"type": "integer"}}}]}),
    );
    assert_eq!(
        failure_reason(node.one_of().unwrap_err()),
        CompositionFailureReason::MultipleMatches { count: 2 }
    );
}

#[test]
fn test_one_of_without_keyword_returns_self() {
    let node = bound(json!({}), json!({"type": "object"}));
    let same = node.one_of().unwrap();
    assert_eq!(same.schema(), node.schema());
}

#[test]
fn test_one_of_unsatisfiable_merge() {
    let node = bound(json!(1), json!({"type": "string", "oneOf": [{"type": "integer"}]}));
    assert!(matches!(
        failure_reason(node.one_of().unwrap_err()),
        CompositionFailureReason::Unsatisfiable(_)
    ));
}

// ============================================================================
// anyOf Tests
// ============================================================================

#[test]
fn test_any_of_returns_every_match() {
    let node = bound(
        json!({"x": 42}),
        json!({"anyOf": [
            {"properties": {"x": {"type": "integer"}}},
            {"properties": {"x": {"type": "number"}}}
        ]}),
    );
    let branches = node.any_of().unwrap();
    assert_eq!(branches.len(), 2);
    assert!(branches.iter().all(|branch| branch.path() == node.path()));
}

#[test]
fn test_any_of_keeps_declaration_order() {
    let node = bound(
        json!(3.5),
        json!({"anyOf": [{"type": "string"}, {"minimum": 3}, {"type": "number"}]}),
    );
    let branches = node.any_of().unwrap();
    let raws: Vec<Value> = branches
        .iter()
        .map(|branch| branch.schema().unwrap().raw().clone())
        .collect();
    assert_eq!(raws, vec![json!({"minimum": 3}), json!({"type": "number"})]);
}

#[test]
fn test_any_of_no_match() {
    let node = bound(json!(true), json!({"anyOf": [{"type": "string"}, {"type": "null"}]}));
    assert_eq!(failure_reason(node.any_of().unwrap_err()), CompositionFailureReason::NoMatch);
}

// ============================================================================
// allOf Tests
// ============================================================================

#[test]
fn test_all_of_unions_required() {
    let schema = json!({
        "allOf": [
            {"required": ["name"], "properties": {"name": {"type": "string"}}},
            {"required": ["email"], "properties": {"email": {"type": "string"}}}
        ]
    });

    let complete = bound(json!({"name": "Alice", "email": "a@example.com"}), schema.clone());
    let merged = complete.all_of().unwrap();
    let required = &merged.schema().unwrap().object().unwrap().required;
    assert!(required.contains(&"name".to_string()));
    assert!(required.contains(&"email".to_string()));

    let missing = bound(json!({"name": "Alice"}), schema);
    let err = missing.all_of().unwrap_err();
    assert_eq!(err.as_validation().unwrap().keyword(), Some(Keyword::Required));
}

#[test]
fn test_all_of_conflict_is_unsatisfiable() {
    let node = bound(json!(1), json!({"allOf": [{"type": "string"}, {"type": "integer"}]}));
    assert!(matches!(
        failure_reason(node.all_of().unwrap_err()),
        CompositionFailureReason::Unsatisfiable(_)
    ));
}

#[test]
fn test_all_of_folds_into_write_checks() {
    let node = bound(
        json!({}),
        json!({"allOf": [
            {"properties": {"a": {"type": "integer"}}},
            {"properties": {"a": {"minimum": 10}}}
        ]}),
    );
    assert!(node.write("a", json!("x")).is_err());
    assert!(node.write("a", json!(5)).is_err());
    node.write("a", json!(12)).unwrap();
}

// ============================================================================
// Conditional Tests
// ============================================================================

fn role_schema() -> Value {
    json!({
        "if": {"properties": {"role": {"const": "admin"}}},
        "then": {"required": ["permissions"]},
        "else": {"properties": {"permissions": false}}
    })
}

#[test]
fn test_if_then_selects_then_branch() {
    let admin = bound(json!({"role": "admin"}), role_schema());
    let node = admin.if_then().unwrap();
    assert_eq!(node.schema().unwrap().raw(), &json!({"required": ["permissions"]}));
}

#[test]
fn test_if_then_selects_else_branch() {
    let guest = bound(json!({"role": "guest"}), role_schema());
    let node = guest.if_then().unwrap();
    assert_eq!(node.schema().unwrap().raw(), &json!({"properties": {"permissions": false}}));
    assert!(node.write("permissions", json!(["read"])).is_err());
}

#[test]
fn test_if_then_missing_branch_is_unconstrained() {
    let node = bound(json!(5), json!({"if": {"type": "string"}, "then": {"minLength": 2}}));
    let selected = node.if_then().unwrap();
    assert!(selected.schema().unwrap().is_unconstrained());
}

// ============================================================================
// not / contains Tests
// ============================================================================

#[test]
fn test_not_of() {
    let node = bound(json!("text"), json!({"not": {"type": "integer"}}));
    assert!(node.not_of(None).unwrap());

    let string = SchemaNode::parse(&json!({"type": "string"})).unwrap();
    assert!(!node.not_of(Some(&string)).unwrap());

    let plain = ValidatingNode::unbound(json!(1));
    assert!(plain.not_of(None).unwrap());
}

#[test]
fn test_contains() {
    let node = bound(json!([1, "two", 3]), json!({"contains": {"type": "string"}}));
    assert!(node.contains(None).unwrap());

    let big = SchemaNode::parse(&json!({"type": "number", "minimum": 10})).unwrap();
    assert!(!node.contains(Some(&big)).unwrap());

    let scalar = ValidatingNode::unbound(json!("abc"));
    assert!(!scalar.contains(Some(&big)).unwrap());
    assert!(!ValidatingNode::unbound(json!([1])).contains(None).unwrap());
}

#[test]
fn test_predicates_report_dangling_nodes() {
    let root = bound(
        json!({"items": [1, "two"]}),
        json!({
            "properties": {
                "items": {
                    "contains": {"type": "string"},
                    "not": {"maxItems": 0},
                    "if": {"minItems": 1},
                    "then": {"maxItems": 5}
                }
            }
        }),
    );
    let items = root.child("items").unwrap();
    assert!(items.contains(None).unwrap());
    root.remove("items").unwrap();

    assert!(matches!(items.contains(None), Err(Error::DanglingPath(_))));
    assert!(matches!(items.not_of(None), Err(Error::DanglingPath(_))));
    assert!(matches!(items.if_then(), Err(Error::DanglingPath(_))));
}

#[test]
fn test_compose_dispatch() {
    let node = bound(json!([1]), json!({"contains": {"const": 1}}));
    assert!(matches!(
        node.compose(CompositionKind::Contains, None).unwrap(),
        CompositionOutcome::Predicate(true)
    ));
    match node.compose(CompositionKind::AnyOf, None).unwrap() {
        CompositionOutcome::Branches(branches) => assert_eq!(branches.len(), 1),
        other => panic!("unexpected outcome {other:?}"),
    }
}

// ============================================================================
// Projection Tests
// ============================================================================

#[test]
fn test_project_keeps_declared_keys() {
    let node = bound(
        json!({"name": "Alice", "secret": "x", "S_tag": "t", "address": {"city": "Oslo", "zip": 1}}),
        json!({
            "properties": {
                "name": {"type": "string"},
                "address": {"properties": {"city": {"type": "string"}}}
            },
            "patternProperties": {"^S_": {}}
        }),
    );
    assert_eq!(
        node.project().unwrap(),
        json!({"name": "Alice", "S_tag": "t", "address": {"city": "Oslo"}})
    );
    assert!(node.read("secret").is_ok());
}

#[test]
fn test_project_resolves_unique_one_of() {
    let node = bound(json!({"type": "bot", "token": "t", "extra": 1}), account_schema());
    assert_eq!(node.project().unwrap(), json!({"type": "bot", "token": "t"}));
}

#[test]
fn test_project_without_declared_properties_keeps_value() {
    let node = bound(json!({"a": 1}), json!({"type": "object"}));
    assert_eq!(node.project().unwrap(), json!({"a": 1}));
}
