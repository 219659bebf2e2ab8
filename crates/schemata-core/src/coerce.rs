//! # Coercion — Best-Effort Value Conversion
//!
//! Converts a raw [`Value`] to a target kind. Binding always coerces
//! leniently (`strict = false`) and leaves unconvertible values for
//! validation to report; strict mode turns every failed conversion into
//! [`SchemaError::InvalidValue`].
//!
//! ## Rules
//!
//! - `Null` passes through unchanged regardless of strictness.
//! - Lenient: the empty string coerced to any non-string target is unset
//!   (`Ok(None)`).
//! - Boolean: `true|yes|on|1` and `false|no|off|0`, case-insensitive.
//! - Number: integer parse unless the text contains `.`.
//! - Date: epoch milliseconds (numbers or integral strings), RFC 3339,
//!   ISO-like date and date-time strings.
//! - Pattern: regex source or `/source/flags` literal.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::{Regex, RegexBuilder};

use crate::error::SchemaError;
use crate::value::Value;

/// Target kind for [`coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoerceTarget {
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Pattern,
    /// Pass-through.
    Any,
    /// Plain object or instance.
    Object,
}

impl CoerceTarget {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Pattern => "pattern",
            Self::Any => "any",
            Self::Object => "object",
        }
    }

    /// The target matching a scalar value's own kind, used by coercing merges.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Int(_) | Value::Float(_) => Self::Number,
            Value::BigInt(_) => Self::BigInt,
            Value::String(_) => Self::String,
            Value::Date(_) => Self::Date,
            Value::Pattern(_) => Self::Pattern,
            Value::Map(_) | Value::Instance(_) => Self::Object,
            Value::Null | Value::Array(_) => Self::Any,
        }
    }
}

/// Coerce `value` to `target`.
///
/// Returns `Ok(None)` when the result is "unset" (lenient empty strings,
/// lenient failures for targets that have no sensible fallback).
///
/// # Errors
///
/// In strict mode, returns [`SchemaError::InvalidValue`] when the value
/// cannot be converted.
pub fn coerce(value: Value, target: CoerceTarget, strict: bool) -> Result<Option<Value>, SchemaError> {
    if value.is_null() {
        return Ok(Some(value));
    }
    if !strict && target != CoerceTarget::String && matches!(&value, Value::String(s) if s.is_empty()) {
        return Ok(None);
    }

    match target {
        CoerceTarget::Any => Ok(Some(value)),
        CoerceTarget::String => Ok(Some(match value {
            Value::String(_) => value,
            other => Value::String(other.to_string()),
        })),
        CoerceTarget::Number => to_number(value, strict),
        CoerceTarget::BigInt => to_bigint(value, strict),
        CoerceTarget::Boolean => to_boolean(value, strict),
        CoerceTarget::Date => to_date(value, strict),
        CoerceTarget::Pattern => to_pattern(value, strict),
        CoerceTarget::Object => match value {
            Value::Map(_) | Value::Instance(_) => Ok(Some(value)),
            other if strict => Err(invalid(target, &other)),
            other => Ok(Some(other)),
        },
    }
}

fn invalid(target: CoerceTarget, value: &Value) -> SchemaError {
    SchemaError::InvalidValue {
        target: target.name().to_string(),
        value: value.to_string(),
    }
}

fn to_number(value: Value, strict: bool) -> Result<Option<Value>, SchemaError> {
    let parsed = match &value {
        Value::Int(_) => return Ok(Some(value)),
        Value::Float(f) if !f.is_nan() => return Ok(Some(value)),
        Value::BigInt(n) => Some(i64::try_from(*n).map(Value::Int).unwrap_or(Value::Float(*n as f64))),
        Value::Date(d) => Some(Value::Int(d.timestamp_millis())),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    };
    match parsed {
        Some(v) => Ok(Some(v)),
        None if strict => Err(invalid(CoerceTarget::Number, &value)),
        None => Ok(Some(value)),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.contains('.') {
        return text.parse::<f64>().ok().filter(|f| !f.is_nan()).map(Value::Float);
    }
    text.parse::<i64>()
        .map(Value::Int)
        .ok()
        .or_else(|| text.parse::<f64>().ok().filter(|f| !f.is_nan()).map(Value::Float))
}

fn to_bigint(value: Value, strict: bool) -> Result<Option<Value>, SchemaError> {
    let parsed = match &value {
        Value::BigInt(_) => return Ok(Some(value)),
        Value::Int(i) => Some(i128::from(*i)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i128),
        Value::Bool(b) => Some(i128::from(*b)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) => Ok(Some(Value::BigInt(n))),
        None if strict => Err(invalid(CoerceTarget::BigInt, &value)),
        None => Ok(None),
    }
}

fn to_boolean(value: Value, strict: bool) -> Result<Option<Value>, SchemaError> {
    if let Value::Bool(_) = value {
        return Ok(Some(value));
    }
    let text = value.to_string().trim().to_ascii_lowercase();
    match text.as_str() {
        "true" | "yes" | "on" | "1" => Ok(Some(Value::Bool(true))),
        "false" | "no" | "off" | "0" => Ok(Some(Value::Bool(false))),
        _ if strict => Err(invalid(CoerceTarget::Boolean, &value)),
        _ => Ok(Some(Value::Bool(false))),
    }
}

fn to_date(value: Value, strict: bool) -> Result<Option<Value>, SchemaError> {
    let parsed = match &value {
        Value::Date(_) => return Ok(Some(value)),
        Value::Int(ms) => from_millis(*ms),
        Value::Float(ms) if ms.is_finite() => from_millis(ms.trunc() as i64),
        Value::BigInt(ms) => i64::try_from(*ms).ok().and_then(from_millis),
        Value::String(s) => parse_date(s.trim()),
        _ => None,
    };
    match parsed {
        Some(d) => Ok(Some(Value::Date(d))),
        None if strict => Err(invalid(CoerceTarget::Date, &value)),
        None => Ok(Some(value)),
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Parse the date forms accepted from loosely-typed input.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<i64>().ok().and_then(from_millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::default())))
}

fn to_pattern(value: Value, strict: bool) -> Result<Option<Value>, SchemaError> {
    let compiled = match &value {
        Value::Pattern(_) => return Ok(Some(value)),
        Value::String(s) => compile_pattern(s),
        _ => None,
    };
    match compiled {
        Some(re) => Ok(Some(Value::Pattern(re))),
        None if strict => Err(invalid(CoerceTarget::Pattern, &value)),
        None => Ok(None),
    }
}

/// Compile a pattern from its source, accepting the `/source/flags` literal
/// form (`i`, `m`, `s`, `x` flags).
pub fn compile_pattern(text: &str) -> Option<Regex> {
    compile_literal(text).or_else(|| Regex::new(text).ok())
}

fn compile_literal(text: &str) -> Option<Regex> {
    let rest = text.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (source, flags) = (&rest[..end], &rest[end + 1..]);
    let mut builder = RegexBuilder::new(source);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            // global/unicode/sticky flags have no regex-crate analogue
            'g' | 'u' | 'y' => &mut builder,
            _ => return None,
        };
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(v: impl Into<Value>, target: CoerceTarget) -> Option<Value> {
        coerce(v.into(), target, false).unwrap()
    }

    #[test]
    fn test_null_passes_through_in_both_modes() {
        for target in [CoerceTarget::Number, CoerceTarget::Date, CoerceTarget::Boolean] {
            assert_eq!(coerce(Value::Null, target, true).unwrap(), Some(Value::Null));
            assert_eq!(coerce(Value::Null, target, false).unwrap(), Some(Value::Null));
        }
    }

    #[test]
    fn test_empty_string_is_unset_when_lenient() {
        assert_eq!(lenient("", CoerceTarget::Number), None);
        assert_eq!(lenient("", CoerceTarget::Date), None);
        assert_eq!(lenient("", CoerceTarget::String), Some(Value::from("")));
        assert!(coerce(Value::from(""), CoerceTarget::Number, true).is_err());
    }

    #[test]
    fn test_number_parse_follows_decimal_point() {
        assert!(matches!(lenient("19.9", CoerceTarget::Number), Some(Value::Float(f)) if f == 19.9));
        assert!(matches!(lenient("42", CoerceTarget::Number), Some(Value::Int(42))));
        assert_eq!(lenient("abc", CoerceTarget::Number), Some(Value::from("abc")));
        let err = coerce(Value::from("abc"), CoerceTarget::Number, true).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { .. }));
    }

    #[test]
    fn test_boolean_literals() {
        for t in ["true", "YES", "on", "1"] {
            assert_eq!(coerce(Value::from(t), CoerceTarget::Boolean, true).unwrap(), Some(Value::Bool(true)));
        }
        for f in ["false", "No", "OFF", "0"] {
            assert_eq!(coerce(Value::from(f), CoerceTarget::Boolean, true).unwrap(), Some(Value::Bool(false)));
        }
        assert_eq!(lenient("maybe", CoerceTarget::Boolean), Some(Value::Bool(false)));
        assert!(coerce(Value::from("maybe"), CoerceTarget::Boolean, true).is_err());
        assert_eq!(lenient(1, CoerceTarget::Boolean), Some(Value::Bool(true)));
    }

    #[test]
    fn test_date_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let ms = expected.timestamp_millis();
        assert_eq!(lenient(ms, CoerceTarget::Date), Some(Value::Date(expected)));
        assert_eq!(lenient(ms.to_string(), CoerceTarget::Date), Some(Value::Date(expected)));
        assert_eq!(lenient("2024-03-01T12:00:00Z", CoerceTarget::Date), Some(Value::Date(expected)));
        assert_eq!(lenient("2024-03-01T12:00:00", CoerceTarget::Date), Some(Value::Date(expected)));
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(lenient("2024-03-01", CoerceTarget::Date), Some(Value::Date(midnight)));
    }

    #[test]
    fn test_invalid_date_fails_only_when_strict() {
        assert_eq!(lenient("yesterday", CoerceTarget::Date), Some(Value::from("yesterday")));
        assert!(coerce(Value::from("yesterday"), CoerceTarget::Date, true).is_err());
    }

    #[test]
    fn test_bigint() {
        assert_eq!(lenient("170141183460469231731687303715884105727", CoerceTarget::BigInt), Some(Value::BigInt(i128::MAX)));
        assert_eq!(lenient("1.5", CoerceTarget::BigInt), None);
        assert!(coerce(Value::from("1.5"), CoerceTarget::BigInt, true).is_err());
    }

    #[test]
    fn test_pattern_literal_flags() {
        let Some(Value::Pattern(re)) = lenient("/^abc$/i", CoerceTarget::Pattern) else {
            panic!("expected a pattern");
        };
        assert!(re.is_match("ABC"));
        assert_eq!(lenient("([", CoerceTarget::Pattern), None);
        assert!(coerce(Value::from("(["), CoerceTarget::Pattern, true).is_err());
    }

    #[test]
    fn test_string_target_stringifies() {
        assert_eq!(lenient(12, CoerceTarget::String), Some(Value::from("12")));
        assert_eq!(lenient(true, CoerceTarget::String), Some(Value::from("true")));
    }

    #[test]
    fn test_object_target() {
        let map = Value::Map(Default::default());
        assert_eq!(lenient(map.clone(), CoerceTarget::Object), Some(map));
        assert!(coerce(Value::Int(1), CoerceTarget::Object, true).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Lenient coercion never fails, whatever the input text.
        #[test]
        fn lenient_coercion_never_errors(text in ".{0,24}") {
            for target in [
                CoerceTarget::String, CoerceTarget::Number, CoerceTarget::BigInt,
                CoerceTarget::Boolean, CoerceTarget::Date, CoerceTarget::Pattern,
                CoerceTarget::Any, CoerceTarget::Object,
            ] {
                prop_assert!(coerce(Value::String(text.clone()), target, false).is_ok());
            }
        }

        /// Integers survive a trip through their string form.
        #[test]
        fn integer_text_coerces_back(n in any::<i64>()) {
            let out = coerce(Value::String(n.to_string()), CoerceTarget::Number, true).unwrap();
            prop_assert_eq!(out, Some(Value::Int(n)));
        }
    }
}
