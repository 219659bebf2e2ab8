//! # Schema Validator — Constraint Walk and Class Validators
//!
//! Validates instances against the constraints their registry metadata
//! declares. A pass never stops at the first failure: every violation is
//! collected and returned as one [`SchemaError::Validation`].
//!
//! ## Walk
//!
//! For every field of the requested view:
//!
//! 1. An absent value (null, empty string, empty array) is a `required`
//!    violation when the field is required, and is otherwise skipped.
//! 2. Arrays are type- and length-checked, then each element is checked
//!    under `path[i]`.
//! 3. Scalars are type-checked first. A type mismatch suppresses the
//!    remaining checks for that value. Then `match`, `minlength`,
//!    `maxlength`, `enum`, `min` and `max` each report independently.
//! 4. Nested schema values resolve their concrete type through the
//!    discriminator and are walked recursively under `path.`.
//!
//! Class-level validators run after the whole field walk, innermost types
//! first, and their violation paths are re-rooted under the nested path.
//!
//! ## Messages
//!
//! Messages render when the pass concludes, from the constraint's explicit
//! message or the [`MessageCatalog`] template.

use std::cmp::Ordering;
use std::sync::Arc;

use schemata_core::coerce::parse_date;
use schemata_core::{
    AggregateValidationError, ErrorKind, Instance, SchemaError, SchemaId, ValidatorFailure, Value, Violation,
};
use schemata_registry::{ClassValidator, FieldConfig, FieldType, Limit, SchemaConfig, SchemaRegistry, ValidatorResult};
use tracing::{debug, trace};

use crate::messages::MessageCatalog;
use crate::patterns::PatternCatalog;

/// Validates instances of registered schemas.
#[derive(Debug, Clone)]
pub struct SchemaValidator<'r> {
    registry: &'r SchemaRegistry,
    messages: MessageCatalog,
    patterns: PatternCatalog,
}

/// A class-validator run scheduled for after the field walk.
struct Deferred {
    prefix: String,
    config: Arc<SchemaConfig>,
    instance: Instance,
    view: Option<String>,
}

/// State of one validation pass.
struct Walk {
    partial: bool,
    violations: Vec<Violation>,
    deferred: Vec<Deferred>,
}

impl Walk {
    fn new(partial: bool) -> Self {
        Self {
            partial,
            violations: Vec::new(),
            deferred: Vec::new(),
        }
    }
}

impl<'r> SchemaValidator<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            messages: MessageCatalog::default(),
            patterns: PatternCatalog::default(),
        }
    }

    pub fn with_messages(mut self, messages: MessageCatalog) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternCatalog) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    pub fn patterns(&self) -> &PatternCatalog {
        &self.patterns
    }

    // -- Synchronous ----------------------------------------------------------

    /// Validate `instance` as `id`, restricted to `view` when given.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::Validation`] carrying every violation found.
    /// - [`SchemaError::AsyncValidatorRequired`] if any type reached by the
    ///   walk declares an asynchronous validator.
    /// - [`SchemaError::Validator`] if a class validator fails outright.
    /// - Registry errors for unknown types or views and unresolvable
    ///   discriminators.
    pub fn validate(&self, id: &SchemaId, instance: &Instance, view: Option<&str>) -> Result<(), SchemaError> {
        let walk = self.walk_root(id, instance, view, false)?;
        self.conclude(walk)
    }

    /// Like [`validate`](Self::validate) but skips `required` checks, for
    /// validating patches.
    pub fn validate_partial(&self, id: &SchemaId, instance: &Instance, view: Option<&str>) -> Result<(), SchemaError> {
        let walk = self.walk_root(id, instance, view, true)?;
        self.conclude(walk)
    }

    /// Validate a list of instances in one pass; paths are prefixed `[i]`.
    pub fn validate_all(&self, id: &SchemaId, instances: &[Instance], view: Option<&str>) -> Result<(), SchemaError> {
        let walk = self.walk_list(id, instances, view)?;
        self.conclude(walk)
    }

    /// Validate positional method arguments against the method's declared
    /// parameters.
    ///
    /// Violation paths start with the parameter name. When `prefixes` holds
    /// an entry for a parameter's index, that name is replaced by the prefix
    /// (an empty prefix drops it).
    pub fn validate_method(
        &self,
        id: &SchemaId,
        method: &str,
        args: &[Value],
        prefixes: &[&str],
    ) -> Result<(), SchemaError> {
        let walk = self.walk_method(id, method, args, prefixes)?;
        self.conclude(walk)
    }

    // -- Asynchronous ---------------------------------------------------------

    /// [`validate`](Self::validate), awaiting asynchronous class validators.
    pub async fn validate_async(
        &self,
        id: &SchemaId,
        instance: &Instance,
        view: Option<&str>,
    ) -> Result<(), SchemaError> {
        let walk = self.walk_root(id, instance, view, false)?;
        self.conclude_async(walk).await
    }

    pub async fn validate_partial_async(
        &self,
        id: &SchemaId,
        instance: &Instance,
        view: Option<&str>,
    ) -> Result<(), SchemaError> {
        let walk = self.walk_root(id, instance, view, true)?;
        self.conclude_async(walk).await
    }

    pub async fn validate_all_async(
        &self,
        id: &SchemaId,
        instances: &[Instance],
        view: Option<&str>,
    ) -> Result<(), SchemaError> {
        let walk = self.walk_list(id, instances, view)?;
        self.conclude_async(walk).await
    }

    pub async fn validate_method_async(
        &self,
        id: &SchemaId,
        method: &str,
        args: &[Value],
        prefixes: &[&str],
    ) -> Result<(), SchemaError> {
        let walk = self.walk_method(id, method, args, prefixes)?;
        self.conclude_async(walk).await
    }

    // -- Entry walks ----------------------------------------------------------

    fn walk_root(&self, id: &SchemaId, instance: &Instance, view: Option<&str>, partial: bool) -> Result<Walk, SchemaError> {
        let mut walk = Walk::new(partial);
        self.walk_instance(&mut walk, "", id, instance, view)?;
        Ok(walk)
    }

    fn walk_list(&self, id: &SchemaId, instances: &[Instance], view: Option<&str>) -> Result<Walk, SchemaError> {
        let mut walk = Walk::new(false);
        for (i, instance) in instances.iter().enumerate() {
            self.walk_instance(&mut walk, &format!("[{i}]"), id, instance, view)?;
        }
        Ok(walk)
    }

    fn walk_method(&self, id: &SchemaId, method: &str, args: &[Value], prefixes: &[&str]) -> Result<Walk, SchemaError> {
        let config = self.registry.get(id)?;
        let method = config.method(method)?;
        let mut walk = Walk::new(false);
        for parameter in &method.parameters {
            let name = parameter.field.name.as_str();
            let (reported, deferred) = (walk.violations.len(), walk.deferred.len());
            self.walk_field(&mut walk, name, &parameter.field, args.get(parameter.index))?;
            if let Some(prefix) = prefixes.get(parameter.index) {
                for violation in &mut walk.violations[reported..] {
                    violation.path = reroot(&violation.path, name, prefix);
                }
                for pending in &mut walk.deferred[deferred..] {
                    pending.prefix = reroot(&pending.prefix, name, prefix);
                }
            }
        }
        Ok(walk)
    }

    // -- Field walk -----------------------------------------------------------

    fn walk_instance(
        &self,
        walk: &mut Walk,
        prefix: &str,
        requested: &SchemaId,
        instance: &Instance,
        view: Option<&str>,
    ) -> Result<(), SchemaError> {
        let own = instance.schema();
        let schema = if self.registry.is_assignable(own, requested) {
            let config = self.registry.get(own)?;
            if config.is_discriminated_base && config.discriminated_field.is_some() {
                self.registry.resolve_instance_type(own, instance.fields())?
            } else {
                own.clone()
            }
        } else {
            self.registry.resolve_instance_type(requested, instance.fields())?
        };
        let config = self.registry.get(&schema)?;
        trace!(schema = %schema, prefix, "validating instance");
        for field in config.view(view)?.iter() {
            let path = join(prefix, &field.name);
            self.walk_field(walk, &path, field, instance.get(&field.name))?;
        }
        if !config.validators.is_empty() {
            walk.deferred.push(Deferred {
                prefix: prefix.to_string(),
                config: Arc::clone(&config),
                instance: instance.clone(),
                view: view.map(str::to_string),
            });
        }
        Ok(())
    }

    fn walk_field(&self, walk: &mut Walk, path: &str, field: &FieldConfig, value: Option<&Value>) -> Result<(), SchemaError> {
        let Some(value) = value.filter(|v| !v.is_absent()) else {
            if field.is_required() && !walk.partial {
                let explicit = field.required.as_ref().and_then(|r| r.message.as_deref());
                walk.violations.push(report(Violation::new(path, ErrorKind::Required), explicit));
            }
            return Ok(());
        };
        if !field.array {
            return self.walk_element(walk, path, field, value, true);
        }
        let Some(items) = value.as_array() else {
            walk.violations.push(report(
                Violation::new(path, ErrorKind::Type)
                    .with_type("array")
                    .with_value(value.clone()),
                None,
            ));
            return Ok(());
        };
        check_length(walk, path, field, items.len(), value);
        for (i, item) in items.iter().enumerate() {
            if !item.is_null() {
                self.walk_element(walk, &format!("{path}[{i}]"), field, item, false)?;
            }
        }
        Ok(())
    }

    /// Check one value of a field. `whole` is false for array elements,
    /// whose length constraints were checked against the array.
    fn walk_element(
        &self,
        walk: &mut Walk,
        path: &str,
        field: &FieldConfig,
        value: &Value,
        whole: bool,
    ) -> Result<(), SchemaError> {
        let type_ok = match &field.field_type {
            FieldType::Any | FieldType::Object => return Ok(()),
            FieldType::Schema(nested) => return self.walk_nested(walk, path, nested, value),
            FieldType::Adapter(adapter) => adapter.is_valid(value),
            primitive => type_matches(primitive, value),
        };
        if !type_ok {
            walk.violations.push(report(
                Violation::new(path, ErrorKind::Type)
                    .with_type(field.field_type.name())
                    .with_value(value.clone()),
                None,
            ));
            return Ok(());
        }

        if let Some(rule) = &field.pattern {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !rule.pattern.is_match(&text) {
                walk.violations.push(report(
                    Violation::new(path, ErrorKind::Match)
                        .with_value(value.clone())
                        .with_regex(self.patterns.describe(&rule.pattern)),
                    rule.message.as_deref(),
                ));
            }
        }
        if whole {
            if let Value::String(s) = value {
                check_length(walk, path, field, s.chars().count(), value);
            }
        }
        if let Some(rule) = &field.enumeration {
            if !rule.values.contains(value) {
                walk.violations.push(report(
                    Violation::new(path, ErrorKind::Enum)
                        .with_value(value.clone())
                        .with_limit(Value::Array(rule.values.clone())),
                    rule.message.as_deref(),
                ));
            }
        }
        for (rule, kind, outside) in [
            (&field.min, ErrorKind::Min, Ordering::Less),
            (&field.max, ErrorKind::Max, Ordering::Greater),
        ] {
            let Some(rule) = rule else { continue };
            if compare(value, rule.limit) == Some(outside) {
                walk.violations.push(report(
                    Violation::new(path, kind)
                        .with_value(value.clone())
                        .with_limit(rule.limit.to_value()),
                    rule.message.as_deref(),
                ));
            }
        }
        Ok(())
    }

    fn walk_nested(&self, walk: &mut Walk, path: &str, nested: &SchemaId, value: &Value) -> Result<(), SchemaError> {
        match value {
            Value::Instance(inner) => self.walk_instance(walk, path, nested, inner, None),
            Value::Map(map) => {
                let resolved = self.registry.resolve_instance_type(nested, map)?;
                let inner = Instance::with_fields(resolved, map.clone());
                self.walk_instance(walk, path, nested, &inner, None)
            }
            other => {
                walk.violations.push(report(
                    Violation::new(path, ErrorKind::Type)
                        .with_type(nested.as_str())
                        .with_value(other.clone()),
                    None,
                ));
                Ok(())
            }
        }
    }

    // -- Conclusion -----------------------------------------------------------

    fn conclude(&self, mut walk: Walk) -> Result<(), SchemaError> {
        if let Some(pending) = walk.deferred.iter().find(|d| d.config.has_async_validators()) {
            return Err(SchemaError::AsyncValidatorRequired(pending.config.id.to_string()));
        }
        for pending in std::mem::take(&mut walk.deferred) {
            for validator in &pending.config.validators {
                if let ClassValidator::Sync(validate) = validator {
                    let outcome = validate(&pending.instance, pending.view.as_deref());
                    absorb(&mut walk.violations, &pending.prefix, outcome)?;
                }
            }
        }
        self.verdict(walk.violations)
    }

    async fn conclude_async(&self, mut walk: Walk) -> Result<(), SchemaError> {
        for pending in std::mem::take(&mut walk.deferred) {
            for validator in &pending.config.validators {
                let outcome = match validator {
                    ClassValidator::Sync(validate) => validate(&pending.instance, pending.view.as_deref()),
                    ClassValidator::Async(validate) => validate(pending.instance.clone(), pending.view.clone()).await,
                };
                absorb(&mut walk.violations, &pending.prefix, outcome)?;
            }
        }
        self.verdict(walk.violations)
    }

    fn verdict(&self, mut violations: Vec<Violation>) -> Result<(), SchemaError> {
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &mut violations {
            let explicit = (!violation.message.is_empty()).then(|| violation.message.clone());
            self.messages.fill(violation, explicit.as_deref());
        }
        debug!(count = violations.len(), "validation failed");
        Err(AggregateValidationError::new(violations).into())
    }
}

/// Attach the constraint's explicit message template, if any; templates
/// are rendered when the pass concludes.
fn report(violation: Violation, explicit: Option<&str>) -> Violation {
    match explicit {
        Some(template) => violation.with_message(template),
        None => violation,
    }
}

fn check_length(walk: &mut Walk, path: &str, field: &FieldConfig, len: usize, value: &Value) {
    if let Some(rule) = &field.min_length {
        if len < rule.limit {
            walk.violations.push(report(
                Violation::new(path, ErrorKind::MinLength)
                    .with_value(value.clone())
                    .with_limit(Value::Int(rule.limit as i64)),
                rule.message.as_deref(),
            ));
        }
    }
    if let Some(rule) = &field.max_length {
        if len > rule.limit {
            walk.violations.push(report(
                Violation::new(path, ErrorKind::MaxLength)
                    .with_value(value.clone())
                    .with_limit(Value::Int(rule.limit as i64)),
                rule.message.as_deref(),
            ));
        }
    }
}

fn absorb(into: &mut Vec<Violation>, prefix: &str, outcome: ValidatorResult) -> Result<(), SchemaError> {
    let reported = match outcome {
        Ok(violations) | Err(ValidatorFailure::Invalid(violations)) => violations,
        Err(ValidatorFailure::Failed(source)) => return Err(SchemaError::Validator(source)),
    };
    into.extend(reported.into_iter().map(|mut violation| {
        violation.path = join(prefix, &violation.path);
        violation
    }));
    Ok(())
}

fn type_matches(field_type: &FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::String => matches!(value, Value::String(_)),
        FieldType::Number => matches!(value, Value::Int(_)) || matches!(value, Value::Float(f) if !f.is_nan()),
        FieldType::BigInt => matches!(value, Value::BigInt(_) | Value::Int(_)),
        FieldType::Boolean => matches!(value, Value::Bool(_)),
        FieldType::Date => matches!(value, Value::Date(_)),
        FieldType::Pattern => matches!(value, Value::Pattern(_)),
        _ => true,
    }
}

/// Order of `value` against a range limit. Dates compare by epoch
/// milliseconds; numeric and date strings are parsed first.
fn compare(value: &Value, limit: Limit) -> Option<Ordering> {
    match limit {
        Limit::Number(bound) => {
            let n = match value {
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                Value::Date(d) => d.timestamp_millis() as f64,
                other => other.as_f64()?,
            };
            n.partial_cmp(&bound)
        }
        Limit::Date(bound) => {
            let ms = match value {
                Value::Date(d) => d.timestamp_millis(),
                Value::String(s) => parse_date(s)?.timestamp_millis(),
                Value::Int(ms) => *ms,
                _ => return None,
            };
            Some(ms.cmp(&bound.timestamp_millis()))
        }
    }
}

fn join(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        prefix.to_string()
    } else if path.starts_with('[') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}.{path}")
    }
}

/// Replace the leading parameter `name` of `path` with `prefix`.
fn reroot(path: &str, name: &str, prefix: &str) -> String {
    let Some(rest) = path.strip_prefix(name) else {
        return path.to_string();
    };
    if rest.is_empty() {
        prefix.to_string()
    } else if let Some(rest) = rest.strip_prefix('.') {
        join(prefix, rest)
    } else if rest.starts_with('[') {
        format!("{prefix}{rest}")
    } else {
        path.to_string()
    }
}
