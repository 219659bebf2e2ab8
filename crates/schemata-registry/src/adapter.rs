//! # Type Adapters
//!
//! Some field types are neither primitives nor registered schemas: a geo
//! point, a money amount, a colour. A [`TypeAdapter`] teaches binding how to
//! shape such a value and validation how to recognise a well-formed one.
//! Fields reference an adapter through [`FieldType::Adapter`].
//!
//! [`FieldType::Adapter`]: crate::field::FieldType::Adapter

use std::fmt;

use schemata_core::{coerce, CoerceTarget, Map, Value};

/// Binding and validation hooks for a custom value type.
pub trait TypeAdapter: Send + Sync + fmt::Debug {
    /// Type name reported in `type` violations.
    fn name(&self) -> &str;

    /// Shape a raw inbound value. `None` leaves the field unset.
    ///
    /// Binding is permissive: values the adapter cannot understand should be
    /// returned unchanged so validation can report them.
    fn bind(&self, raw: Value) -> Option<Value>;

    /// Returns true when `value` is a well-formed value of this type.
    fn is_valid(&self, value: &Value) -> bool;
}

/// A two-dimensional point stored as `[x, y]`.
///
/// Accepts `[x, y]` arrays, `"x,y"` strings and `{x, y}` objects; each
/// coordinate is coerced to a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointAdapter;

impl PointAdapter {
    fn coordinate(value: Value) -> Option<f64> {
        coerce(value, CoerceTarget::Number, false)
            .ok()
            .flatten()
            .and_then(|v| v.as_f64())
            .filter(|f| f.is_finite())
    }

    fn pair(x: Value, y: Value) -> Option<Value> {
        Some(Value::Array(vec![
            Value::Float(Self::coordinate(x)?),
            Value::Float(Self::coordinate(y)?),
        ]))
    }

    fn from_map(map: &Map) -> Option<Value> {
        Self::pair(map.get("x")?.clone(), map.get("y")?.clone())
    }
}

impl TypeAdapter for PointAdapter {
    fn name(&self) -> &str {
        "point"
    }

    fn bind(&self, raw: Value) -> Option<Value> {
        let shaped = match &raw {
            Value::Array(items) if items.len() == 2 => Self::pair(items[0].clone(), items[1].clone()),
            Value::String(text) => match text.split_once(',') {
                Some((x, y)) => Self::pair(Value::from(x.trim()), Value::from(y.trim())),
                None => None,
            },
            Value::Map(map) => Self::from_map(map),
            Value::Instance(instance) => Self::from_map(instance.fields()),
            _ => None,
        };
        Some(shaped.unwrap_or(raw))
    }

    fn is_valid(&self, value: &Value) -> bool {
        match value.as_array() {
            Some([x, y]) => [x, y]
                .iter()
                .all(|c| c.as_f64().is_some_and(f64::is_finite)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(x: f64, y: f64) -> Value {
        Value::Array(vec![Value::Float(x), Value::Float(y)])
    }

    #[test]
    fn test_point_accepts_array_string_and_object() {
        let adapter = PointAdapter;
        assert_eq!(adapter.bind(Value::from(json!([1, "2.5"]))), Some(point(1.0, 2.5)));
        assert_eq!(adapter.bind(Value::from("3, 4")), Some(point(3.0, 4.0)));
        assert_eq!(adapter.bind(Value::from(json!({"x": 5, "y": 6}))), Some(point(5.0, 6.0)));
    }

    #[test]
    fn test_point_leaves_unparsable_input_for_validation() {
        let adapter = PointAdapter;
        let raw = Value::from("north");
        let bound = adapter.bind(raw.clone());
        assert_eq!(bound, Some(raw));
        assert!(!adapter.is_valid(&Value::from("north")));
        assert!(adapter.is_valid(&point(0.0, 0.0)));
        assert!(!adapter.is_valid(&Value::from(json!([1, 2, 3]))));
    }
}
