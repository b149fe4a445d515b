//! Schema-bound tree demo
//!
//! Walks through default filling, validated writes, shared storage and the
//! composition keywords. Run with `RUST_LOG=schematree=trace` to see default
//! materialization and composition resolution.

use schematree::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== SchemaTree Demo ===\n");

    println!("Demo 1: Defaults and Validated Writes");
    demo_writes()?;
    println!();

    println!("Demo 2: Shared Storage");
    demo_shared_storage()?;
    println!();

    println!("Demo 3: Composition");
    demo_composition()?;
    println!();

    println!("Demo 4: Snapshots");
    demo_snapshots()?;

    println!("\n=== Demo Complete ===");
    Ok(())
}

fn demo_writes() -> Result<()> {
    let task = ValidatingNode::with_schema(
        json!({"title": "Write docs"}),
        &json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "minLength": 1},
                "status": {"enum": ["pending", "done"], "default": "pending"},
                "estimate": {"type": "integer", "minimum": 0}
            },
            "additionalProperties": false
        }),
    )?;
    println!("  Initial value: {}", task.to_value()?);

    task.write("estimate", json!(3))?;
    println!("  ✓ estimate = 3 accepted");

    for (key, value) in [("estimate", json!(-1)), ("status", json!("lost")), ("owner", json!("me"))] {
        match task.write(key, value) {
            Ok(()) => println!("  ✗ {key} should have been rejected"),
            Err(e) => println!("  ✓ Correctly rejected: {e}"),
        }
    }
    println!("  Final value: {}", task.to_value()?);
    Ok(())
}

fn demo_shared_storage() -> Result<()> {
    let root = ValidatingNode::unbound(json!({"user": {"name": "Alice"}}));
    let user = root.child("user")?;
    user.write("name", json!("Bob"))?;
    println!("  Written through child, read from root: {}", root.store().snapshot());
    Ok(())
}

fn demo_composition() -> Result<()> {
    let account = ValidatingNode::with_schema(
        json!({"kind": "bot", "token": "t-1"}),
        &json!({
            "oneOf": [
                {"properties": {"kind": {"const": "user"}, "email": {"type": "string"}}},
                {"properties": {"kind": {"const": "bot"}, "token": {"type": "string"}}}
            ]
        }),
    )?;
    let bot = account.one_of()?;
    println!("  oneOf selected branch: {}", bot.schema().map_or(json!(null), |s| s.raw().clone()));
    match bot.write("token", json!(7)) {
        Ok(()) => println!("  ✗ token should be a string"),
        Err(e) => println!("  ✓ Branch schema enforced: {e}"),
    }

    let number = ValidatingNode::with_schema(
        json!(42),
        &json!({"anyOf": [{"type": "integer"}, {"minimum": 10}]}),
    )?;
    println!("  anyOf matches for 42: {}", number.any_of()?.len());

    let tags = ValidatingNode::with_schema(json!(["a", "urgent"]), &json!({}))?;
    let urgent = SchemaNode::parse(&json!({"const": "urgent"}))?;
    println!("  contains 'urgent': {}", tags.contains(Some(&urgent))?);
    Ok(())
}

fn demo_snapshots() -> Result<()> {
    let config = ValidatingNode::with_schema(
        json!({"port": 8080}),
        &json!({"properties": {"port": {"type": "integer", "maximum": 65535}}}),
    )?;
    let encoded = config.to_json_string()?;
    println!("  Encoded: {encoded}");

    let restored = ValidatingNode::from_json_str(&encoded)?;
    match restored.write("port", json!(70000)) {
        Ok(()) => println!("  ✗ Restored node lost its schema"),
        Err(e) => println!("  ✓ Restored node still validates: {e}"),
    }
    Ok(())
}
