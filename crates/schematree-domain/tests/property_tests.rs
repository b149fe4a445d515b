//! Property-based tests for domain invariants
//!
//! Uses proptest to verify that paths, type sets and schema merging keep
//! their invariants across arbitrary inputs.

use proptest::prelude::*;
use schematree_domain::value_objects::{
    JsonPath, PathSegment, SchemaNode, TypeSet, merge_schemas, values_equal,
};
use serde_json::{Value, json};

fn segment_strategy() -> impl Strategy<Value = PathSegment> {
    prop_oneof![
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}".prop_map(PathSegment::Key),
        "[ -~]{0,8}".prop_map(PathSegment::Key),
        (0usize..1000).prop_map(PathSegment::Index),
    ]
}

fn type_set_strategy() -> impl Strategy<Value = TypeSet> {
    (1u8..128).prop_map(TypeSet::from_bits_truncate)
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

proptest! {
    /// Display output always parses back to the same path
    #[test]
    fn path_display_parses_back(segments in prop::collection::vec(segment_strategy(), 0..6)) {
        let path = JsonPath::from_segments(segments);
        let parsed = JsonPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(parsed, path);
    }

    /// A parent is a prefix of its child and one segment shorter
    #[test]
    fn path_parent_is_prefix(
        segments in prop::collection::vec(segment_strategy(), 0..6),
        last in segment_strategy(),
    ) {
        let parent = JsonPath::from_segments(segments);
        let child = parent.append(last);
        prop_assert!(parent.is_prefix_of(&child));
        prop_assert_eq!(child.depth(), parent.depth() + 1);
        prop_assert_eq!(child.parent(), Some(parent));
    }

    /// Intersection is commutative and never widens either side
    #[test]
    fn type_intersection_commutes(a in type_set_strategy(), b in type_set_strategy()) {
        let ab = a.intersect(b);
        prop_assert_eq!(ab, b.intersect(a));
        for value in [json!(null), json!(true), json!(1), json!(1.5), json!("s"), json!([]), json!({})] {
            if ab.matches(&value) {
                prop_assert!(a.matches(&value) && b.matches(&value));
            }
        }
    }

    /// Structural equality is reflexive and symmetric
    #[test]
    fn values_equal_reflexive(a in leaf_strategy(), b in leaf_strategy()) {
        prop_assert!(values_equal(&a, &a));
        prop_assert_eq!(values_equal(&a, &b), values_equal(&b, &a));
    }

    /// Merging a schema with itself changes nothing
    #[test]
    fn merge_is_idempotent(min in 0u32..100, extra in 0u32..100, required in "[a-z]{1,4}") {
        let schema = json!({
            "type": "object",
            "minProperties": min,
            "maxProperties": min + extra,
            "required": [required]
        });
        let merged = merge_schemas(&[&schema, &schema]).unwrap();
        prop_assert_eq!(&merged, &schema);
        prop_assert!(SchemaNode::parse(&merged).is_ok());
    }

    /// Merged bounds are the tightest of the inputs
    #[test]
    fn merge_tightens_bounds(a in 0i64..1000, b in 0i64..1000) {
        let merged = merge_schemas(&[&json!({"minimum": a, "maximum": a + 10}), &json!({"minimum": b, "maximum": b + 10})]).unwrap();
        prop_assert_eq!(merged["minimum"].as_i64(), Some(a.max(b)));
        prop_assert_eq!(merged["maximum"].as_i64(), Some((a + 10).min(b + 10)));
    }
}
