//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout Schemata. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Registry errors name the schema (and view/method/field) involved.
//! - Discriminator errors carry the unresolvable discriminator string.
//! - Validation failures are aggregated: one error carries every violation
//!   found in a single pass.
//! - Custom validator failures that are not shaped as violations propagate
//!   through [`SchemaError::Validator`] with their original source.

use thiserror::Error;

use crate::violation::AggregateValidationError;

/// Top-level error type for Schemata.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema was never registered, or it has been removed.
    #[error("schema '{0}' is not registered")]
    NotRegistered(String),

    /// A named view was requested that the schema never declared.
    #[error("unknown view '{view}' for schema '{schema}'")]
    UnknownView {
        /// Schema the view was requested on.
        schema: String,
        /// Requested view name.
        view: String,
    },

    /// A view definition references a field the schema does not have.
    #[error("view '{view}' of schema '{schema}' references unknown field '{field}'")]
    UnknownField {
        /// Schema owning the view.
        schema: String,
        /// View being computed.
        view: String,
        /// Field that could not be found.
        field: String,
    },

    /// A method was requested that has no registered parameters.
    #[error("unknown method '{method}' on schema '{schema}'")]
    UnknownMethod {
        /// Schema the method was requested on.
        schema: String,
        /// Requested method name.
        method: String,
    },

    /// The discriminator resolved to a type that is not assignable to the
    /// requested type.
    #[error("resolved type '{resolved}' is not assignable to requested type '{requested}'")]
    TypeMismatch {
        /// Type the caller asked for.
        requested: String,
        /// Type the discriminator resolved to.
        resolved: String,
    },

    /// No concrete type is mapped for the discriminator value.
    #[error("unable to resolve discriminated type for '{schema}': {}", .value.as_deref().unwrap_or("<missing>"))]
    UnresolvedDiscriminator {
        /// Type the caller asked for.
        schema: String,
        /// Discriminator value found in the data, if any.
        value: Option<String>,
    },

    /// Two sibling types claim the same discriminator string.
    #[error("discriminator '{value}' under base '{base}' is claimed by both '{existing}' and '{incoming}'")]
    DuplicateDiscriminator {
        /// Base type owning the discriminator map.
        base: String,
        /// Contested discriminator string.
        value: String,
        /// Type already holding the string.
        existing: String,
        /// Type attempting to claim it.
        incoming: String,
    },

    /// One or more constraint violations.
    #[error(transparent)]
    Validation(#[from] AggregateValidationError),

    /// Strict coercion could not convert the value.
    #[error("invalid {target} value: {value}")]
    InvalidValue {
        /// Target type name.
        target: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Deep-merge encountered incompatible values.
    #[error("cannot merge {left} with {right}")]
    MergeConflict {
        /// Description of the existing value.
        left: String,
        /// Description of the incoming value.
        right: String,
    },

    /// Deep-merge target was not a container.
    #[error("cannot merge onto a simple value: {0}")]
    MergeOntoPrimitive(String),

    /// Synchronous validation was asked to run an asynchronous validator.
    #[error("schema '{0}' declares asynchronous validators; use validate_async")]
    AsyncValidatorRequired(String),

    /// A custom validator failed with an error that is not a violation.
    #[error("custom validator failed: {0}")]
    Validator(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A schema identifier was empty or blank.
    #[error("invalid schema id: {0:?}")]
    InvalidSchemaId(String),
}

impl SchemaError {
    /// Returns the aggregated violations when this is a validation failure.
    pub fn violations(&self) -> Option<&AggregateValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}
