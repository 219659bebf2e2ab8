//! # Field Metadata
//!
//! [`FieldFacts`] is the partial, mergeable form of a field's metadata that
//! registration calls accumulate. [`FieldConfig`] is the frozen form stored
//! in an installed schema.
//!
//! ## Merging
//!
//! Facts registered for the same field merge: scalar facts (type, access,
//! constraints) are overwritten by the later call, list facts (`aliases`,
//! `specifiers`, enum values) accumulate as an ordered union. The same rule
//! merges a child type's facts over the facts it inherits from its parent.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use schemata_core::patterns;
use schemata_core::{CoerceTarget, SchemaId, Value};

use crate::adapter::TypeAdapter;

/// Target type of a field.
#[derive(Clone, Default)]
pub enum FieldType {
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Pattern,
    /// Anything; bound as given and never type-checked.
    #[default]
    Any,
    /// A plain object that is not a registered schema.
    Object,
    /// A nested registered schema.
    Schema(SchemaId),
    /// A custom value type.
    Adapter(Arc<dyn TypeAdapter>),
}

impl FieldType {
    /// Name used in `type` violations.
    pub fn name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Pattern => "pattern",
            Self::Any => "any",
            Self::Object => "object",
            Self::Schema(id) => id.as_str(),
            Self::Adapter(adapter) => adapter.name(),
        }
    }

    /// Coercion target for primitive types; `None` for schemas and adapters.
    pub fn coerce_target(&self) -> Option<CoerceTarget> {
        Some(match self {
            Self::String => CoerceTarget::String,
            Self::Number => CoerceTarget::Number,
            Self::BigInt => CoerceTarget::BigInt,
            Self::Boolean => CoerceTarget::Boolean,
            Self::Date => CoerceTarget::Date,
            Self::Pattern => CoerceTarget::Pattern,
            Self::Any => CoerceTarget::Any,
            Self::Object => CoerceTarget::Object,
            Self::Schema(_) | Self::Adapter(_) => return None,
        })
    }

    /// The nested schema, for schema-typed fields.
    pub fn schema(&self) -> Option<&SchemaId> {
        match self {
            Self::Schema(id) => Some(id),
            _ => None,
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Schema(a), Self::Schema(b)) => a == b,
            (Self::Adapter(a), Self::Adapter(b)) => a.name() == b.name(),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(id) => write!(f, "Schema({id})"),
            Self::Adapter(adapter) => write!(f, "Adapter({})", adapter.name()),
            other => f.write_str(other.name()),
        }
    }
}

/// Read/write direction of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Normal,
    /// Never bound from input.
    ReadOnly,
    WriteOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Required {
    pub active: bool,
    pub message: Option<String>,
}

/// A `match` constraint.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: Regex,
    pub message: Option<String>,
}

impl PartialEq for MatchRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.message == other.message
    }
}

/// Bound of a `min`/`max` constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Number(f64),
    Date(DateTime<Utc>),
}

impl Limit {
    pub fn to_value(self) -> Value {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::Int(n as i64),
            Self::Number(n) => Value::Float(n),
            Self::Date(d) => Value::Date(d),
        }
    }
}

impl From<f64> for Limit {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Limit {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Limit {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<DateTime<Utc>> for Limit {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeRule {
    pub limit: Limit,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LengthRule {
    pub limit: usize,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumRule {
    pub values: Vec<Value>,
    pub message: Option<String>,
}

/// Numeric precision applied while binding.
///
/// `decimals == Some(0)` truncates to an integer; any other decimal count
/// rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Precision {
    pub digits: Option<u32>,
    pub decimals: Option<u32>,
}

/// Frozen metadata of one field (or method parameter).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    /// Type that declared (or last overrode) the field.
    pub owner: SchemaId,
    pub name: String,
    pub field_type: FieldType,
    /// Every constraint except the length rules applies per element.
    pub array: bool,
    pub aliases: Vec<String>,
    pub access: Access,
    pub required: Option<Required>,
    pub pattern: Option<MatchRule>,
    pub min: Option<RangeRule>,
    pub max: Option<RangeRule>,
    pub min_length: Option<LengthRule>,
    pub max_length: Option<LengthRule>,
    pub enumeration: Option<EnumRule>,
    pub precision: Option<Precision>,
    pub specifiers: Vec<String>,
    /// Value a freshly bound instance starts with.
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl FieldConfig {
    /// True when a `required` constraint is declared and not deactivated.
    pub fn is_required(&self) -> bool {
        self.required.as_ref().is_some_and(|r| r.active)
    }

    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    /// The nested schema, for schema-typed fields.
    pub fn schema(&self) -> Option<&SchemaId> {
        self.field_type.schema()
    }
}

/// Partial field metadata, built fluently and merged by registration.
///
/// ```
/// use schemata_registry::FieldFacts;
///
/// let facts = FieldFacts::new().string().required().min_length(2).alias("full_name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldFacts {
    pub(crate) name: Option<String>,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) array: Option<bool>,
    pub(crate) aliases: Vec<String>,
    pub(crate) access: Option<Access>,
    pub(crate) required: Option<Required>,
    pub(crate) pattern: Option<MatchRule>,
    pub(crate) min: Option<RangeRule>,
    pub(crate) max: Option<RangeRule>,
    pub(crate) min_length: Option<LengthRule>,
    pub(crate) max_length: Option<LengthRule>,
    pub(crate) enum_values: Vec<Value>,
    pub(crate) enum_message: Option<String>,
    pub(crate) digits: Option<u32>,
    pub(crate) decimals: Option<u32>,
    pub(crate) specifiers: Vec<String>,
    pub(crate) default: Option<Value>,
    pub(crate) description: Option<String>,
}

fn union<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

impl FieldFacts {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Type -----------------------------------------------------------------

    pub fn of_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn string(self) -> Self {
        self.of_type(FieldType::String)
    }

    pub fn number(self) -> Self {
        self.of_type(FieldType::Number)
    }

    /// A number truncated to an integer while binding.
    pub fn integer(self) -> Self {
        self.of_type(FieldType::Number).decimals(0)
    }

    pub fn bigint(self) -> Self {
        self.of_type(FieldType::BigInt)
    }

    pub fn boolean(self) -> Self {
        self.of_type(FieldType::Boolean)
    }

    pub fn date(self) -> Self {
        self.of_type(FieldType::Date)
    }

    pub fn regexp(self) -> Self {
        self.of_type(FieldType::Pattern)
    }

    pub fn any(self) -> Self {
        self.of_type(FieldType::Any)
    }

    pub fn object(self) -> Self {
        self.of_type(FieldType::Object)
    }

    pub fn schema(self, id: SchemaId) -> Self {
        self.of_type(FieldType::Schema(id))
    }

    pub fn adapter(self, adapter: Arc<dyn TypeAdapter>) -> Self {
        self.of_type(FieldType::Adapter(adapter))
    }

    pub fn array(mut self) -> Self {
        self.array = Some(true);
        self
    }

    // -- Naming and access ----------------------------------------------------

    /// Parameter name; ignored for fields, which are named at registration.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        union(&mut self.aliases, vec![alias.into()]);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = Some(Access::ReadOnly);
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Some(Access::WriteOnly);
        self
    }

    // -- Constraints ----------------------------------------------------------

    pub fn required(self) -> Self {
        self.required_rule(true, None)
    }

    pub fn required_with(self, message: impl Into<String>) -> Self {
        self.required_rule(true, Some(message.into()))
    }

    /// Deactivates an inherited `required` constraint.
    pub fn optional(self) -> Self {
        self.required_rule(false, None)
    }

    fn required_rule(mut self, active: bool, message: Option<String>) -> Self {
        self.required = Some(Required { active, message });
        self
    }

    pub fn matches(mut self, pattern: Regex) -> Self {
        self.pattern = Some(MatchRule { pattern, message: None });
        self
    }

    pub fn matches_with(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.pattern = Some(MatchRule {
            pattern,
            message: Some(message.into()),
        });
        self
    }

    pub fn email(self) -> Self {
        self.matches(patterns::EMAIL.clone())
    }

    pub fn telephone(self) -> Self {
        self.matches(patterns::TELEPHONE.clone())
    }

    pub fn url(self) -> Self {
        self.matches(patterns::URL.clone())
    }

    pub fn simple_name(self) -> Self {
        self.matches(patterns::SIMPLE_NAME.clone())
    }

    pub fn postal_code(self) -> Self {
        self.matches(patterns::POSTAL_CODE.clone())
    }

    pub fn min(mut self, limit: impl Into<Limit>) -> Self {
        self.min = Some(RangeRule {
            limit: limit.into(),
            message: None,
        });
        self
    }

    pub fn min_with(mut self, limit: impl Into<Limit>, message: impl Into<String>) -> Self {
        self.min = Some(RangeRule {
            limit: limit.into(),
            message: Some(message.into()),
        });
        self
    }

    pub fn max(mut self, limit: impl Into<Limit>) -> Self {
        self.max = Some(RangeRule {
            limit: limit.into(),
            message: None,
        });
        self
    }

    pub fn max_with(mut self, limit: impl Into<Limit>, message: impl Into<String>) -> Self {
        self.max = Some(RangeRule {
            limit: limit.into(),
            message: Some(message.into()),
        });
        self
    }

    pub fn min_length(mut self, limit: usize) -> Self {
        self.min_length = Some(LengthRule { limit, message: None });
        self
    }

    pub fn min_length_with(mut self, limit: usize, message: impl Into<String>) -> Self {
        self.min_length = Some(LengthRule {
            limit,
            message: Some(message.into()),
        });
        self
    }

    pub fn max_length(mut self, limit: usize) -> Self {
        self.max_length = Some(LengthRule { limit, message: None });
        self
    }

    pub fn max_length_with(mut self, limit: usize, message: impl Into<String>) -> Self {
        self.max_length = Some(LengthRule {
            limit,
            message: Some(message.into()),
        });
        self
    }

    /// Allowed values; repeated calls accumulate.
    pub fn one_of<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        union(&mut self.enum_values, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn enum_message(mut self, message: impl Into<String>) -> Self {
        self.enum_message = Some(message.into());
        self
    }

    pub fn precision(mut self, digits: u32, decimals: u32) -> Self {
        self.digits = Some(digits);
        self.decimals = Some(decimals);
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    // -- Free-form ------------------------------------------------------------

    pub fn specifier(mut self, specifier: impl Into<String>) -> Self {
        union(&mut self.specifiers, vec![specifier.into()]);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // -- Merge and freeze -----------------------------------------------------

    /// Merge later facts over these: scalars overwrite, lists union.
    pub fn merge(&mut self, later: FieldFacts) {
        fn over<T>(slot: &mut Option<T>, later: Option<T>) {
            if later.is_some() {
                *slot = later;
            }
        }
        over(&mut self.name, later.name);
        over(&mut self.field_type, later.field_type);
        over(&mut self.array, later.array);
        union(&mut self.aliases, later.aliases);
        over(&mut self.access, later.access);
        over(&mut self.required, later.required);
        over(&mut self.pattern, later.pattern);
        over(&mut self.min, later.min);
        over(&mut self.max, later.max);
        over(&mut self.min_length, later.min_length);
        over(&mut self.max_length, later.max_length);
        union(&mut self.enum_values, later.enum_values);
        over(&mut self.enum_message, later.enum_message);
        over(&mut self.digits, later.digits);
        over(&mut self.decimals, later.decimals);
        union(&mut self.specifiers, later.specifiers);
        over(&mut self.default, later.default);
        over(&mut self.description, later.description);
    }

    /// Freeze into a [`FieldConfig`].
    pub fn build(self, owner: SchemaId, name: impl Into<String>) -> FieldConfig {
        let precision = match (self.digits, self.decimals) {
            (None, None) => None,
            (digits, decimals) => Some(Precision { digits, decimals }),
        };
        let enumeration = if self.enum_values.is_empty() {
            None
        } else {
            Some(EnumRule {
                values: self.enum_values,
                message: self.enum_message,
            })
        };
        FieldConfig {
            owner,
            name: name.into(),
            field_type: self.field_type.unwrap_or_default(),
            array: self.array.unwrap_or(false),
            aliases: self.aliases,
            access: self.access.unwrap_or_default(),
            required: self.required,
            pattern: self.pattern,
            min: self.min,
            max: self.max,
            min_length: self.min_length,
            max_length: self.max_length,
            enumeration,
            precision,
            specifiers: self.specifiers,
            default: self.default,
            description: self.description,
        }
    }
}

/// Unfreeze an installed field so a child type can merge over it.
impl From<&FieldConfig> for FieldFacts {
    fn from(config: &FieldConfig) -> Self {
        let (enum_values, enum_message) = match &config.enumeration {
            Some(rule) => (rule.values.clone(), rule.message.clone()),
            None => (Vec::new(), None),
        };
        Self {
            name: Some(config.name.clone()),
            field_type: Some(config.field_type.clone()),
            array: Some(config.array),
            aliases: config.aliases.clone(),
            access: Some(config.access),
            required: config.required.clone(),
            pattern: config.pattern.clone(),
            min: config.min.clone(),
            max: config.max.clone(),
            min_length: config.min_length.clone(),
            max_length: config.max_length.clone(),
            enum_values,
            enum_message,
            digits: config.precision.and_then(|p| p.digits),
            decimals: config.precision.and_then(|p| p.decimals),
            specifiers: config.specifiers.clone(),
            default: config.default.clone(),
            description: config.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> SchemaId {
        SchemaId::new("Person").unwrap()
    }

    #[test]
    fn test_required_is_opt_in() {
        assert!(!FieldFacts::new().string().build(owner(), "nick").is_required());
        assert!(FieldFacts::new().string().required().build(owner(), "name").is_required());

        let mut facts = FieldFacts::new().string().required();
        facts.merge(FieldFacts::new().optional());
        let config = facts.build(owner(), "name");
        assert!(!config.is_required());
        assert!(config.required.is_some_and(|r| !r.active));
    }

    #[test]
    fn test_later_scalars_win_and_lists_union() {
        let mut facts = FieldFacts::new().string().alias("a").alias("b").one_of(["x", "y"]);
        facts.merge(FieldFacts::new().number().alias("b").alias("c").one_of(["y", "z"]));
        let config = facts.build(owner(), "f");
        assert_eq!(config.field_type, FieldType::Number);
        assert_eq!(config.aliases, vec!["a", "b", "c"]);
        let values = config.enumeration.unwrap().values;
        assert_eq!(values, vec![Value::from("x"), Value::from("y"), Value::from("z")]);
    }

    #[test]
    fn test_merge_keeps_facts_the_later_call_omits() {
        let mut facts = FieldFacts::new().string().required().min_length(2);
        facts.merge(FieldFacts::new().max_length(8));
        let config = facts.build(owner(), "name");
        assert!(config.is_required());
        assert_eq!(config.min_length.map(|r| r.limit), Some(2));
        assert_eq!(config.max_length.map(|r| r.limit), Some(8));
    }

    #[test]
    fn test_required_only_when_declared_and_active() {
        assert!(!FieldFacts::new().build(owner(), "a").is_required());
        assert!(FieldFacts::new().required().build(owner(), "a").is_required());
        let mut facts = FieldFacts::new().required();
        facts.merge(FieldFacts::new().optional());
        assert!(!facts.build(owner(), "a").is_required());
    }

    #[test]
    fn test_integer_is_number_with_zero_decimals() {
        let config = FieldFacts::new().integer().build(owner(), "age");
        assert_eq!(config.field_type, FieldType::Number);
        assert_eq!(config.precision.and_then(|p| p.decimals), Some(0));
    }

    #[test]
    fn test_unfreeze_round_trips() {
        let config = FieldFacts::new()
            .date()
            .array()
            .alias("when")
            .min(Utc::now())
            .specifier("utc")
            .describe("event dates")
            .build(owner(), "dates");
        let rebuilt = FieldFacts::from(&config).build(owner(), "dates");
        assert_eq!(rebuilt, config);
    }

    #[test]
    fn test_limit_renders_integral_numbers_as_integers() {
        assert_eq!(Limit::from(3).to_value(), Value::Int(3));
        assert!(matches!(Limit::from(2.5).to_value(), Value::Float(f) if f == 2.5));
    }
}
