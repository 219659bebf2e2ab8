//! # Binder — Loosely-Typed Input to Instances
//!
//! [`Binder::bind`] walks the fields of the target type's view and copies
//! matching input values onto a fresh [`Instance`], coercing each to the
//! field's declared type.
//!
//! ## Per-field Steps
//!
//! 1. Skip read-only fields and fields vetoed by the caller's filters.
//! 2. Take the input value by field name, else by each alias in order.
//! 3. Array fields wrap scalars; strings with commas split on `\s*,\s*`.
//! 4. Nested schemas recurse, adapters shape their own values, everything
//!    else is coerced leniently with numeric precision applied.
//! 5. Assign under the declared name.
//!
//! Binding is permissive. Values that cannot be coerced stay as given (or
//! unset) for validation to report; only type resolution fails.

use once_cell::sync::Lazy;
use regex::Regex;
use schemata_core::{coerce, expand_paths, CoerceTarget, Instance, Map, SchemaError, SchemaId, Value};
use schemata_registry::{FieldConfig, FieldType, Precision, SchemaRegistry};
use tracing::{debug, trace};

use crate::options::BindOptions;

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\s*,\s*") {
    Ok(re) => re,
    Err(e) => panic!("list separator pattern failed to compile: {e}"),
});

/// Binds raw values onto instances of registered schemas.
#[derive(Debug, Clone, Copy)]
pub struct Binder<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Binder<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Bind `raw` as an instance of `id`.
    ///
    /// `Null` yields `None`. An instance already assignable to `id` is
    /// returned unchanged. Non-object input binds as an empty object.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::NotRegistered`] for unknown types.
    /// - [`SchemaError::UnknownView`] if `options.view` is not declared.
    /// - [`SchemaError::UnresolvedDiscriminator`] /
    ///   [`SchemaError::TypeMismatch`] from discriminated type resolution.
    pub fn bind(&self, id: &SchemaId, raw: Value, options: &BindOptions) -> Result<Option<Instance>, SchemaError> {
        self.bind_value(id, raw, options, options.view.as_deref())
    }

    /// Bind a parsed JSON document.
    pub fn bind_json(
        &self,
        id: &SchemaId,
        json: serde_json::Value,
        options: &BindOptions,
    ) -> Result<Option<Instance>, SchemaError> {
        self.bind(id, Value::from(json), options)
    }

    /// Bind a flat map whose keys use dotted/bracket paths, such as a parsed
    /// query string.
    pub fn bind_flat(&self, id: &SchemaId, flat: Map, options: &BindOptions) -> Result<Option<Instance>, SchemaError> {
        self.bind(id, Value::Map(expand_paths(flat)), options)
    }

    fn bind_value(
        &self,
        id: &SchemaId,
        raw: Value,
        options: &BindOptions,
        view: Option<&str>,
    ) -> Result<Option<Instance>, SchemaError> {
        let data = match raw {
            Value::Null => return Ok(None),
            Value::Instance(instance) if self.registry.is_assignable(instance.schema(), id) => {
                trace!(schema = %id, "input already bound");
                return Ok(Some(instance));
            }
            Value::Instance(instance) => instance.into_fields(),
            Value::Map(map) => map,
            other => {
                debug!(schema = %id, kind = other.type_name(), "non-object input bound as an empty object");
                Map::new()
            }
        };
        self.bind_map(id, data, options, view).map(Some)
    }

    fn bind_map(
        &self,
        requested: &SchemaId,
        mut data: Map,
        options: &BindOptions,
        view: Option<&str>,
    ) -> Result<Instance, SchemaError> {
        let resolved = self.registry.resolve_instance_type(requested, &data)?;
        let config = self.registry.get(&resolved)?;
        let fields = config.view(view)?;

        let mut instance = Instance::new(resolved.clone());
        for field in config.fields.iter() {
            if let Some(default) = &field.default {
                instance.set(field.name.clone(), default.clone());
            }
        }

        for field in fields.iter() {
            if field.is_read_only() || !options.keeps_field(field) {
                trace!(schema = %resolved, field = %field.name, "field skipped");
                continue;
            }
            let Some(raw) = take(&mut data, field) else { continue };
            if !options.keeps_value(&raw, field) {
                trace!(schema = %resolved, field = %field.name, "value vetoed");
                continue;
            }
            if let Some(value) = self.bind_field(field, raw, options)? {
                instance.set(field.name.clone(), value);
            }
        }

        if let (Some(field), Some(value)) = (&config.discriminated_field, config.discriminator_value()) {
            if instance.get(field).map_or(true, Value::is_absent) {
                instance.set(field.clone(), Value::String(value));
            }
        }
        if !data.is_empty() {
            trace!(schema = %resolved, ignored = data.len(), "input keys without a field");
        }
        Ok(instance)
    }

    fn bind_field(&self, field: &FieldConfig, raw: Value, options: &BindOptions) -> Result<Option<Value>, SchemaError> {
        if !field.array {
            return self.bind_element(field, raw, options);
        }
        let items = match raw {
            Value::Null => return Ok(Some(Value::Null)),
            Value::Array(items) => items,
            Value::String(text) if text.contains(',') => LIST_SEPARATOR
                .split(text.trim())
                .map(Value::from)
                .collect(),
            scalar => vec![scalar],
        };
        let mut bound = Vec::with_capacity(items.len());
        for item in items {
            if let Some(value) = self.bind_element(field, item, options)? {
                bound.push(value);
            }
        }
        Ok(Some(Value::Array(bound)))
    }

    fn bind_element(&self, field: &FieldConfig, raw: Value, options: &BindOptions) -> Result<Option<Value>, SchemaError> {
        match &field.field_type {
            FieldType::Schema(nested) => match raw {
                Value::Map(_) | Value::Instance(_) => {
                    Ok(self.bind_value(nested, raw, options, None)?.map(Value::Instance))
                }
                other => {
                    debug!(field = %field.name, nested = %nested, kind = other.type_name(), "non-object value left for validation");
                    Ok(Some(other))
                }
            },
            FieldType::Adapter(adapter) => Ok(adapter.bind(raw)),
            primitive => {
                let target = primitive.coerce_target().unwrap_or(CoerceTarget::Any);
                let coerced = coerce(raw, target, false)?;
                Ok(coerced.map(|value| apply_precision(value, field.precision)))
            }
        }
    }
}

/// Remove the field's value from `data`, by name then by alias.
fn take(data: &mut Map, field: &FieldConfig) -> Option<Value> {
    if let Some(value) = data.remove(&field.name) {
        return Some(value);
    }
    field.aliases.iter().find_map(|alias| data.remove(alias))
}

/// Truncate (`decimals == 0`) or round floats to the declared decimals.
fn apply_precision(value: Value, precision: Option<Precision>) -> Value {
    let Some(decimals) = precision.and_then(|p| p.decimals) else {
        return value;
    };
    match value {
        Value::Float(f) if f.is_finite() && decimals == 0 => {
            let truncated = f.trunc();
            if truncated.abs() < 9.2e18 {
                Value::Int(truncated as i64)
            } else {
                Value::Float(truncated)
            }
        }
        Value::Float(f) if f.is_finite() => {
            let factor = 10f64.powi(decimals.min(15) as i32);
            Value::Float((f * factor).round() / factor)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals(n: u32) -> Option<Precision> {
        Some(Precision {
            digits: None,
            decimals: Some(n),
        })
    }

    #[test]
    fn test_zero_decimals_truncates() {
        assert_eq!(apply_precision(Value::Float(19.9), decimals(0)), Value::Int(19));
        assert_eq!(apply_precision(Value::Float(-2.7), decimals(0)), Value::Int(-2));
    }

    #[test]
    fn test_positive_decimals_round() {
        assert_eq!(apply_precision(Value::Float(1.2345), decimals(2)), Value::Float(1.23));
        assert_eq!(apply_precision(Value::Float(1.235), decimals(1)), Value::Float(1.2));
    }

    #[test]
    fn test_precision_leaves_other_values() {
        assert_eq!(apply_precision(Value::Int(7), decimals(0)), Value::Int(7));
        assert_eq!(apply_precision(Value::from("x"), decimals(0)), Value::from("x"));
        assert_eq!(apply_precision(Value::Float(1.5), None), Value::Float(1.5));
    }

    #[test]
    fn test_list_separator() {
        let parts: Vec<_> = LIST_SEPARATOR.split("a , b,c").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }
}
