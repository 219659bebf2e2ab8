//! # Deep Merge
//!
//! [`deep_assign`] merges a source value into a target container under one
//! of four [`MergeMode`]s:
//!
//! | Mode | Arrays | Mismatched scalar kinds |
//! |------|--------|-------------------------|
//! | `Replace` | source replaces target | source wins |
//! | `Loose` | index-by-index, length from source | source wins |
//! | `Strict` | index-by-index, length from source | [`SchemaError::MergeConflict`] |
//! | `Coerce` | index-by-index, length from source | source coerced to the target's kind |
//!
//! Objects always merge key-by-key. A `Null` on either side yields the
//! source. Mixing containers with scalars, or arrays with objects, is a
//! conflict in every mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coerce::{coerce, CoerceTarget};
use crate::error::SchemaError;
use crate::value::{Instance, Map, SchemaId, Value};

/// How [`deep_assign`] resolves differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    Replace,
    #[default]
    Loose,
    Strict,
    Coerce,
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "loose" => Ok(Self::Loose),
            "strict" => Ok(Self::Strict),
            "coerce" => Ok(Self::Coerce),
            other => Err(format!("unknown merge mode: {other}")),
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replace => "replace",
            Self::Loose => "loose",
            Self::Strict => "strict",
            Self::Coerce => "coerce",
        })
    }
}

/// Deep-merge `source` into `target` and return the merged value.
///
/// # Errors
///
/// - [`SchemaError::MergeOntoPrimitive`] if `target` is not an array,
///   object, or instance.
/// - [`SchemaError::MergeConflict`] for incompatible shapes, and for
///   mismatched scalar kinds in [`MergeMode::Strict`].
pub fn deep_assign(target: Value, source: Value, mode: MergeMode) -> Result<Value, SchemaError> {
    if target.is_simple() {
        return Err(SchemaError::MergeOntoPrimitive(describe(&target)));
    }
    merge(target, source, mode)
}

fn merge(left: Value, right: Value, mode: MergeMode) -> Result<Value, SchemaError> {
    if left.is_null() || right.is_null() {
        return Ok(right);
    }
    match (left, right) {
        (Value::Array(_), right @ Value::Array(_)) if mode == MergeMode::Replace => Ok(right),
        (Value::Array(left), Value::Array(right)) => {
            let mut existing = left.into_iter();
            let merged = right
                .into_iter()
                .map(|item| match existing.next() {
                    Some(prev) => merge(prev, item, mode),
                    None => Ok(item),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(merged))
        }
        (left, right) if is_object(&left) && is_object(&right) => {
            let (schema, left) = split_object(left);
            let (_, right) = split_object(right);
            let merged = merge_maps(left, right, mode)?;
            Ok(match schema {
                Some(schema) => Value::Instance(Instance::with_fields(schema, merged)),
                None => Value::Map(merged),
            })
        }
        (left, right) if left.is_simple() && right.is_simple() => merge_scalars(left, right, mode),
        (left, right) => Err(SchemaError::MergeConflict {
            left: describe(&left),
            right: describe(&right),
        }),
    }
}

fn merge_maps(mut left: Map, right: Map, mode: MergeMode) -> Result<Map, SchemaError> {
    for (key, incoming) in right {
        let merged = match left.remove(&key) {
            Some(existing) => merge(existing, incoming, mode)?,
            None => incoming,
        };
        left.insert(key, merged);
    }
    Ok(left)
}

fn merge_scalars(left: Value, right: Value, mode: MergeMode) -> Result<Value, SchemaError> {
    let kind = CoerceTarget::of(&left);
    if kind == CoerceTarget::of(&right) {
        return Ok(right);
    }
    match mode {
        MergeMode::Strict => Err(SchemaError::MergeConflict {
            left: describe(&left),
            right: describe(&right),
        }),
        MergeMode::Coerce => Ok(coerce(right, kind, false)?.unwrap_or(left)),
        MergeMode::Loose | MergeMode::Replace => Ok(right),
    }
}

fn is_object(value: &Value) -> bool {
    matches!(value, Value::Map(_) | Value::Instance(_))
}

fn split_object(value: Value) -> (Option<SchemaId>, Map) {
    match value {
        Value::Instance(instance) => {
            let schema = instance.schema().clone();
            (Some(schema), instance.into_fields())
        }
        Value::Map(map) => (None, map),
        _ => (None, Map::new()),
    }
}

fn describe(value: &Value) -> String {
    format!("{value} [{}]", value.type_name())
}
