//! # Value Model
//!
//! Raw input arrives loosely typed: parsed JSON, URL query maps, CLI
//! arguments. Schemata models it as [`Value`], a tagged enum over the
//! scalar and container kinds the engine understands. A key that is absent
//! from a [`Map`] or [`Instance`] is "unset"; [`Value::Null`] is an explicit
//! null.
//!
//! [`Instance`] is the result of binding: the concrete [`SchemaId`] the data
//! was bound as, plus the fields that were set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;

/// String-keyed, key-ordered map of values.
pub type Map = BTreeMap<String, Value>;

/// Identity of a schema type.
///
/// A non-blank type name. Inheritance and discriminator lookups are keyed
/// by this identity alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId(String);

impl SchemaId {
    /// Create a schema id, rejecting blank names.
    pub fn new(name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidSchemaId(name));
        }
        Ok(Self(name))
    }

    /// The type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SchemaId {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaId> for String {
    fn from(id: SchemaId) -> Self {
        id.0
    }
}

/// A dynamically-typed value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Arbitrary-size integer (beyond `i64`).
    BigInt(i128),
    /// Text.
    String(String),
    /// Point in time, always UTC.
    Date(DateTime<Utc>),
    /// Compiled regular expression.
    Pattern(Regex),
    /// Ordered list.
    Array(Vec<Value>),
    /// Plain string-keyed object.
    Map(Map),
    /// Object bound to a registered schema.
    Instance(Instance),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Pattern(_) => "pattern",
            Self::Array(_) => "array",
            Self::Map(_) => "object",
            Self::Instance(_) => "instance",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, the empty string, and the empty array all count as "absent"
    /// for required-ness checks.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Returns true for values that are not containers.
    pub fn is_simple(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Map(_) | Self::Instance(_))
    }

    /// Returns true for integral and floating-point numbers.
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::BigInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Numeric view of numbers and big integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::BigInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Field map of a plain object or a bound instance.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            Self::Instance(i) => Some(i.fields()),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Look up a key on a plain object or a bound instance.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Convert to a `serde_json::Value`.
    ///
    /// Dates become RFC 3339 strings, patterns their source, big integers
    /// outside the `i64` range decimal strings, non-finite floats null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::BigInt(n) => match i64::try_from(*n) {
                Ok(i) => Json::from(i),
                Err(_) => Json::String(n.to_string()),
            },
            Self::String(s) => Json::String(s.clone()),
            Self::Date(d) => Json::String(format_date(d)),
            Self::Pattern(r) => Json::String(r.as_str().to_string()),
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(m) => map_to_json(m),
            Self::Instance(i) => map_to_json(i.fields()),
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub(crate) fn format_date(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn map_to_json(map: &Map) -> serde_json::Value {
    serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => x == y,
        (Value::Int(x), Value::BigInt(y)) | (Value::BigInt(y), Value::Int(x)) => {
            i128::from(*x) == *y
        }
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => a == b,
            (a, b) => numbers_equal(a, b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::BigInt(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => f.write_str(&format_date(d)),
            Self::Pattern(r) => f.write_str(r.as_str()),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(_) | Self::Instance(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Self::Float(_) => serializer.serialize_unit(),
            Self::BigInt(n) => match i64::try_from(*n) {
                Ok(i) => serializer.serialize_i64(i),
                Err(_) => serializer.collect_str(n),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&format_date(d)),
            Self::Pattern(r) => serializer.serialize_str(r.as_str()),
            Self::Array(items) => items.serialize(serializer),
            Self::Map(m) => m.serialize(serializer),
            Self::Instance(i) => i.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::BigInt(i128::from(u))
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(obj) => Self::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Self::Instance(instance)
    }
}

impl From<Regex> for Value {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

/// Any timezone-aware date-time converts to a UTC date.
impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::Date(dt.with_timezone(&Utc))
    }
}

/// Calendar dates convert to midnight UTC.
impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Self::Date(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::default())))
    }
}

/// An object bound to a registered schema.
///
/// Holds only fields that were set; a missing key means "not set", which
/// validation distinguishes from an explicit [`Value::Null`] only for
/// reporting purposes (both are "absent" to required-ness checks).
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    schema: SchemaId,
    fields: Map,
}

impl Instance {
    /// A bare instance with no fields set.
    pub fn new(schema: SchemaId) -> Self {
        Self {
            schema,
            fields: Map::new(),
        }
    }

    /// An instance with the given fields already set.
    pub fn with_fields(schema: SchemaId, fields: Map) -> Self {
        Self { schema, fields }
    }

    /// Concrete schema this instance was bound as.
    pub fn schema(&self) -> &SchemaId {
        &self.schema
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Unset a field, returning the previous value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn into_fields(self) -> Map {
        self.fields
    }

    pub fn to_json(&self) -> serde_json::Value {
        map_to_json(&self.fields)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
