//! Integration tests: applying flat form patches to JSON documents.

use schemata_core::{deep_assign, expand_paths, flatten_paths, MergeMode, SchemaError, Value};
use serde_json::json;

fn map(json: serde_json::Value) -> schemata_core::Map {
    match Value::from(json) {
        Value::Map(m) => m,
        other => panic!("expected an object, got {other:?}"),
    }
}

#[test]
fn test_flat_patch_coerces_onto_document() {
    let document = Value::from(json!({
        "name": "Ann",
        "age": 30,
        "home": {"street": "Main", "zip": "12345"},
        "tags": ["a", "b"],
    }));
    let patch = Value::Map(expand_paths(map(json!({
        "age": "31",
        "home.street": "High",
        "tags[0]": "z",
        "tags[1]": "c",
    }))));

    let patched = deep_assign(document, patch, MergeMode::Coerce).unwrap();
    assert_eq!(
        patched.to_json(),
        json!({
            "name": "Ann",
            "age": 31,
            "home": {"street": "High", "zip": "12345"},
            "tags": ["z", "c"],
        })
    );
}

#[test]
fn test_strict_patch_rejects_kind_changes() {
    let document = Value::from(json!({"age": 30}));
    let patch = Value::Map(expand_paths(map(json!({"age": "31"}))));
    let err = deep_assign(document, patch, MergeMode::Strict).unwrap_err();
    assert!(matches!(err, SchemaError::MergeConflict { .. }));
}

#[test]
fn test_flatten_then_expand_restores_document() {
    let tree = map(json!({
        "a": {"b": [1, {"c": true}], "empty": {}},
        "list": [],
        "s": "x",
    }));
    assert_eq!(expand_paths(flatten_paths(&tree)), tree);
}
