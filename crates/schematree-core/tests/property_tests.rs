//! Property-based tests for tree invariants
//!
//! Uses proptest to check that validation ignores keyword order, that
//! wrapping preserves data and that rewrapped trees validate like the
//! originals.

use proptest::prelude::*;
use schematree::prelude::*;
use schematree::ValidationService;
use serde_json::{Map, Value, json};

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Keyword entries that can be combined freely into one schema
fn keyword_entries() -> Vec<(&'static str, Value)> {
    vec![
        ("type", json!(["integer", "string", "array", "object"])),
        ("minimum", json!(-10)),
        ("maximum", json!(500)),
        ("multipleOf", json!(2)),
        ("minLength", json!(1)),
        ("maxLength", json!(4)),
        ("pattern", json!("^[a-m]")),
        ("maxItems", json!(3)),
        ("uniqueItems", json!(true)),
        ("required", json!(["a"])),
        ("maxProperties", json!(3)),
        ("not", json!({"const": 4})),
    ]
}

fn schema_from(entries: &[(&'static str, Value)]) -> SchemaNode {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    SchemaNode::parse(&Value::Object(map)).unwrap()
}

fn person_schema() -> Value {
    json!({
        "properties": {
            "name": {"type": "string", "maxLength": 5},
            "age": {"type": "integer", "minimum": 0, "maximum": 150},
            "tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true}
        }
    })
}

fn write_strategy() -> impl Strategy<Value = (String, Value)> {
    (
        prop_oneof![Just("name"), Just("age"), Just("tags"), Just("other")],
        prop_oneof![
            leaf_strategy(),
            prop::collection::vec("[a-c]", 0..3).prop_map(|tags| json!(tags)),
        ],
    )
        .prop_map(|(key, value)| (key.to_string(), value))
}

proptest! {
    /// The verdict does not depend on the order keywords appear in
    #[test]
    fn validation_ignores_keyword_order(
        shuffled in Just(keyword_entries()).prop_shuffle(),
        data in value_strategy(),
    ) {
        let validator = ValidationService::new();
        let canonical = schema_from(&keyword_entries());
        let reordered = schema_from(&shuffled);
        prop_assert_eq!(validator.is_valid(&data, &canonical), validator.is_valid(&data, &reordered));
    }

    /// Wrapping data that needs no defaults leaves it untouched
    #[test]
    fn wrap_then_unwrap_is_identity(data in value_strategy()) {
        let node = ValidatingNode::with_schema(data.clone(), &person_schema()).unwrap();
        prop_assert_eq!(node.to_value().unwrap(), data);
    }

    /// A rewrapped tree accepts and rejects the same writes as the original
    #[test]
    fn rewrap_validates_identically(writes in prop::collection::vec(write_strategy(), 0..8)) {
        let original = ValidatingNode::with_schema(json!({}), &person_schema()).unwrap();
        for (key, value) in &writes {
            let _ = original.write(key.as_str(), value.clone());
        }
        let rewrapped = ValidatingNode::with_schema(original.to_value().unwrap(), &person_schema()).unwrap();

        for (key, value) in writes {
            let before = original.write(key.as_str(), value.clone()).is_ok();
            let after = rewrapped.write(key.as_str(), value).is_ok();
            prop_assert_eq!(before, after);
        }
        prop_assert_eq!(original.to_value().unwrap(), rewrapped.to_value().unwrap());
    }

    /// A rejected write never changes storage
    #[test]
    fn rejected_write_leaves_storage(write in write_strategy()) {
        let node = ValidatingNode::with_schema(json!({"name": "ann"}), &person_schema()).unwrap();
        let before = node.to_value().unwrap();
        if node.write(write.0.as_str(), write.1).is_err() {
            prop_assert_eq!(node.to_value().unwrap(), before);
        }
    }

    /// Snapshots restore to equal data
    #[test]
    fn snapshot_round_trip(data in value_strategy()) {
        let node = ValidatingNode::with_schema(data, &person_schema()).unwrap();
        let restored = ValidatingNode::from_json_str(&node.to_json_string().unwrap()).unwrap();
        prop_assert_eq!(restored.to_value().unwrap(), node.to_value().unwrap());
    }
}
