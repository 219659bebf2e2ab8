//! # Check Subcommand
//!
//! Binds a JSON document as an instance of a defined schema and validates
//! it. Prints the bound instance, or every violation, as JSON on stdout.
//!
//! Exit codes: 0 when valid, 1 on violations, 2 on operational errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemata_bind::{BindOptions, Binder};
use schemata_core::{Instance, Map, SchemaError, SchemaId, Value, Violation};
use schemata_registry::SchemaRegistry;
use schemata_validate::SchemaValidator;
use serde_json::json;

use crate::definition::Definitions;

/// Arguments for `schemata check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML schema definitions.
    #[arg(long, value_name = "FILE")]
    pub schemas: PathBuf,

    /// Schema to bind the document as.
    #[arg(long = "type", value_name = "TYPE")]
    pub type_name: String,

    /// JSON document; stdin when omitted or `-`.
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Restrict binding and validation to a named view.
    #[arg(long)]
    pub view: Option<String>,

    /// Skip `required` checks.
    #[arg(long)]
    pub partial: bool,

    /// Treat the document as a flat map of dotted/bracket paths.
    #[arg(long)]
    pub flat: bool,
}

/// Outcome of checking one document.
#[derive(Debug)]
pub enum CheckReport {
    /// The document was `null`.
    Empty,
    Valid(Instance),
    Invalid(Vec<Violation>),
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => json!({"valid": true, "value": null}),
            Self::Valid(instance) => json!({"valid": true, "value": instance.to_json()}),
            Self::Invalid(violations) => json!({"valid": false, "errors": violations}),
        }
    }
}

/// Options of a single check.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub view: Option<String>,
    pub partial: bool,
    pub flat: bool,
}

/// Bind `document` as `id` and validate the result.
///
/// # Errors
///
/// Registry and type-resolution errors. Violations are reported through
/// [`CheckReport::Invalid`], not as errors.
pub fn check_document(
    registry: &SchemaRegistry,
    id: &SchemaId,
    document: serde_json::Value,
    options: &CheckOptions,
) -> Result<CheckReport, SchemaError> {
    let mut bind_options = BindOptions::new();
    if let Some(view) = &options.view {
        bind_options = bind_options.view(view.clone());
    }
    let binder = Binder::new(registry);
    let bound = match (options.flat, Value::from(document)) {
        (true, Value::Map(flat)) => binder.bind_flat(id, flat, &bind_options)?,
        (true, Value::Null) => binder.bind_flat(id, Map::new(), &bind_options)?,
        (_, raw) => binder.bind(id, raw, &bind_options)?,
    };
    let Some(instance) = bound else {
        return Ok(CheckReport::Empty);
    };

    let validator = SchemaValidator::new(registry);
    let view = options.view.as_deref();
    let outcome = if options.partial {
        validator.validate_partial(id, &instance, view)
    } else {
        validator.validate(id, &instance, view)
    };
    match outcome {
        Ok(()) => Ok(CheckReport::Valid(instance)),
        Err(SchemaError::Validation(aggregate)) => Ok(CheckReport::Invalid(aggregate.into_inner())),
        Err(other) => Err(other),
    }
}

/// Execute `schemata check`.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let registry = Definitions::from_path(&args.schemas)?.into_registry()?;
    let id = SchemaId::new(args.type_name.as_str())?;
    let document = crate::read_json(args.input.as_deref())?;
    let options = CheckOptions {
        view: args.view.clone(),
        partial: args.partial,
        flat: args.flat,
    };
    let report = check_document(&registry, &id, document, &options)
        .with_context(|| format!("failed to check document as '{id}'"))?;

    match &report {
        CheckReport::Invalid(violations) => {
            tracing::info!(schema = %id, count = violations.len(), "document is invalid");
        }
        _ => tracing::info!(schema = %id, "document is valid"),
    }
    println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    Ok(if report.is_valid() { 0 } else { 1 })
}
