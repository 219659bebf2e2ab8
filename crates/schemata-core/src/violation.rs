//! # Violations — Path-Addressed Validation Errors
//!
//! A [`Violation`] is one constraint failure at one path. Validation never
//! stops at the first failure: every violation found in a pass is collected
//! into a single [`AggregateValidationError`].
//!
//! ## Wire Shape
//!
//! Violations serialize as `{path, kind, message, value?, limit?, type?,
//! regex?}` so callers can hand them straight to an API response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Category of a violation.
///
/// The built-in kinds correspond to field constraints; custom validators may
/// report any other kind through [`ErrorKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    Required,
    Type,
    Match,
    MinLength,
    MaxLength,
    Enum,
    Min,
    Max,
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::Match => "match",
            Self::MinLength => "minlength",
            Self::MaxLength => "maxlength",
            Self::Enum => "enum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Custom(kind) => kind,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(kind: &str) -> Self {
        match kind {
            "required" => Self::Required,
            "type" => Self::Type,
            "match" => Self::Match,
            "minlength" => Self::MinLength,
            "maxlength" => Self::MaxLength,
            "enum" => Self::Enum,
            "min" => Self::Min,
            "max" => Self::Max,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ErrorKind {
    fn from(kind: String) -> Self {
        Self::from(kind.as_str())
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted/bracketed path of the offending value (`address.lines[2]`).
    pub path: String,
    /// Violation category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// The offending value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// The constraint's limit (length, bound, allowed values).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    /// Expected type name, for `type` violations.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Pattern name or source, for `match` violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl Violation {
    /// A violation with no message yet; the validation engine fills the
    /// message from its templates when it is left empty.
    pub fn new(path: impl Into<String>, kind: impl Into<ErrorKind>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
            message: String::new(),
            value: None,
            limit: None,
            type_name: None,
            regex: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_limit(mut self, limit: Value) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root) [{}]: {}", self.kind, self.message)
        } else {
            write!(f, "  {} [{}]: {}", self.path, self.kind, self.message)
        }
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateValidationError {
    violations: Vec<Violation>,
}

impl AggregateValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for AggregateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateValidationError {}

/// Failure outcome of a custom class-level validator.
#[derive(Debug)]
pub enum ValidatorFailure {
    /// Already-shaped violations; merged into the aggregate.
    Invalid(Vec<Violation>),
    /// Any other error; propagates out of validation unchanged.
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl From<Violation> for ValidatorFailure {
    fn from(v: Violation) -> Self {
        Self::Invalid(vec![v])
    }
}

impl From<AggregateValidationError> for ValidatorFailure {
    fn from(err: AggregateValidationError) -> Self {
        Self::Invalid(err.into_inner())
    }
}
