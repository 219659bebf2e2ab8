//! # Expand / Flatten Subcommands
//!
//! Convert between nested JSON documents and flat maps keyed by dotted and
//! bracket paths (`address.lines[0]`), as used by form posts and query
//! strings.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use schemata_core::{expand_paths, flatten_paths, Map, Value};

/// Arguments for `schemata expand` and `schemata flatten`.
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// JSON object; stdin when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

/// Nested form of a flat path map.
pub fn expand_document(document: serde_json::Value) -> Result<serde_json::Value> {
    Ok(Value::Map(expand_paths(object(document)?)).to_json())
}

/// Flat path map of a nested document.
pub fn flatten_document(document: serde_json::Value) -> Result<serde_json::Value> {
    Ok(Value::Map(flatten_paths(&object(document)?)).to_json())
}

fn object(document: serde_json::Value) -> Result<Map> {
    match Value::from(document) {
        Value::Map(map) => Ok(map),
        other => bail!("expected a JSON object, found {}", other.type_name()),
    }
}

pub fn run_expand(args: &TransformArgs) -> Result<u8> {
    let expanded = expand_document(crate::read_json(args.input.as_deref())?)?;
    println!("{}", serde_json::to_string_pretty(&expanded)?);
    Ok(0)
}

pub fn run_flatten(args: &TransformArgs) -> Result<u8> {
    let flattened = flatten_document(crate::read_json(args.input.as_deref())?)?;
    println!("{}", serde_json::to_string_pretty(&flattened)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_and_flatten() {
        let flat = json!({"name": "Ann", "home.street": "Main", "tags[0]": "a", "tags[1]": "b"});
        let nested = expand_document(flat.clone()).unwrap();
        assert_eq!(nested, json!({"name": "Ann", "home": {"street": "Main"}, "tags": ["a", "b"]}));
        assert_eq!(flatten_document(nested).unwrap(), flat);
    }

    #[test]
    fn test_rejects_non_objects() {
        let err = expand_document(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
