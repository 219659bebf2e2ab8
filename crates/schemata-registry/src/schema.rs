//! # Schema Metadata
//!
//! Class-level facts ([`ClassFacts`], [`MethodFacts`]) and the frozen
//! configs ([`SchemaConfig`], [`ViewConfig`], [`MethodConfig`]) that
//! finalize produces from them.
//!
//! ## Views
//!
//! Every config carries the full view (all fields, in declaration order,
//! inherited fields first). Named views are derived from it by inclusion
//! ([`ViewSpec::With`]) or exclusion ([`ViewSpec::Without`]) and keep the
//! full view's order.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemata_core::{Instance, SchemaError, SchemaId, ValidatorFailure, Violation};

use crate::field::FieldConfig;

/// Outcome of a class-level validator.
pub type ValidatorResult = Result<Vec<Violation>, ValidatorFailure>;

/// Boxed future returned by asynchronous validators.
pub type ValidatorFuture = Pin<Box<dyn Future<Output = ValidatorResult> + Send>>;

pub type SyncValidatorFn = dyn Fn(&Instance, Option<&str>) -> ValidatorResult + Send + Sync;

pub type AsyncValidatorFn = dyn Fn(Instance, Option<String>) -> ValidatorFuture + Send + Sync;

/// A class-level validator, run after the field walk of its type.
///
/// Each receives the whole instance and the requested view name.
#[derive(Clone)]
pub enum ClassValidator {
    Sync(Arc<SyncValidatorFn>),
    Async(Arc<AsyncValidatorFn>),
}

impl ClassValidator {
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for ClassValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync(_) => "ClassValidator::Sync",
            Self::Async(_) => "ClassValidator::Async",
        })
    }
}

/// How a named view is derived from the full field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSpec {
    /// Keep only these fields.
    With(Vec<String>),
    /// Keep every field except these.
    Without(Vec<String>),
}

/// Partial class-level metadata.
#[derive(Debug, Clone, Default)]
pub struct ClassFacts {
    pub(crate) parent: Option<SchemaId>,
    pub(crate) views: Vec<(String, ViewSpec)>,
    pub(crate) validators: Vec<ClassValidator>,
    pub(crate) discriminated_field: Option<String>,
    pub(crate) discriminated_type: Option<String>,
    pub(crate) discriminated_base: Option<bool>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
}

impl ClassFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extends(mut self, parent: SchemaId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn view_with<S: Into<String>>(self, name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        self.view(name, ViewSpec::With(fields.into_iter().map(Into::into).collect()))
    }

    pub fn view_without<S: Into<String>>(self, name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        self.view(name, ViewSpec::Without(fields.into_iter().map(Into::into).collect()))
    }

    pub fn view(mut self, name: impl Into<String>, spec: ViewSpec) -> Self {
        let name = name.into();
        self.views.retain(|(existing, _)| *existing != name);
        self.views.push((name, spec));
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Instance, Option<&str>) -> ValidatorResult + Send + Sync + 'static,
    {
        self.validators.push(ClassValidator::Sync(Arc::new(validator)));
        self
    }

    pub fn async_validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(Instance, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ValidatorResult> + Send + 'static,
    {
        let boxed = move |instance: Instance, view: Option<String>| -> ValidatorFuture {
            Box::pin(validator(instance, view))
        };
        self.validators.push(ClassValidator::Async(Arc::new(boxed)));
        self
    }

    /// Declare this type the base of a discriminated family keyed by `field`.
    pub fn discriminated_by(mut self, field: impl Into<String>) -> Self {
        self.discriminated_field = Some(field.into());
        self.discriminated_base = Some(true);
        self
    }

    /// Field carrying the discriminator, without marking this type as base.
    pub fn discriminator_field(mut self, field: impl Into<String>) -> Self {
        self.discriminated_field = Some(field.into());
        self
    }

    /// Explicit discriminator string of this type.
    pub fn discriminator(mut self, value: impl Into<String>) -> Self {
        self.discriminated_type = Some(value.into());
        self
    }

    pub fn discriminated_base(mut self, base: bool) -> Self {
        self.discriminated_base = Some(base);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Merge later facts over these.
    pub(crate) fn merge(&mut self, later: ClassFacts) {
        if later.parent.is_some() {
            self.parent = later.parent;
        }
        for (name, spec) in later.views {
            self.views.retain(|(existing, _)| *existing != name);
            self.views.push((name, spec));
        }
        self.validators.extend(later.validators);
        if later.discriminated_field.is_some() {
            self.discriminated_field = later.discriminated_field;
        }
        if later.discriminated_type.is_some() {
            self.discriminated_type = later.discriminated_type;
        }
        if later.discriminated_base.is_some() {
            self.discriminated_base = later.discriminated_base;
        }
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
    }
}

/// Partial method-level metadata.
#[derive(Debug, Clone, Default)]
pub struct MethodFacts {
    pub(crate) description: Option<String>,
}

impl MethodFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn merge(&mut self, later: MethodFacts) {
        if later.description.is_some() {
            self.description = later.description;
        }
    }
}

/// Ordered fields of one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewConfig {
    names: Vec<String>,
    fields: BTreeMap<String, FieldConfig>,
}

impl ViewConfig {
    pub(crate) fn push(&mut self, field: FieldConfig) {
        if !self.fields.contains_key(&field.name) {
            self.names.push(field.name.clone());
        }
        self.fields.insert(field.name.clone(), field);
    }

    /// Field names in view order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields in view order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldConfig> + '_ {
        self.names.iter().filter_map(move |name| self.fields.get(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A positional method argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterConfig {
    pub index: usize,
    pub field: FieldConfig,
}

/// Parameters of one method, ordered by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodConfig {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterConfig>,
}

impl MethodConfig {
    pub fn parameter(&self, index: usize) -> Option<&ParameterConfig> {
        self.parameters.iter().find(|p| p.index == index)
    }
}

/// Installed (or provisional) configuration of one schema type.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub id: SchemaId,
    pub parent: Option<SchemaId>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// All fields.
    pub fields: ViewConfig,
    /// Named views.
    pub views: BTreeMap<String, ViewConfig>,
    pub(crate) view_specs: Vec<(String, ViewSpec)>,
    /// Inherited validators first.
    pub validators: Vec<ClassValidator>,
    pub discriminated_field: Option<String>,
    pub discriminated_type: Option<String>,
    pub is_discriminated_base: bool,
    /// Base whose discriminator map this type resolves through.
    pub discriminator_base: Option<SchemaId>,
    pub methods: BTreeMap<String, MethodConfig>,
    /// False for provisional snapshots of pending registrations.
    pub finalized: bool,
}

impl SchemaConfig {
    pub(crate) fn empty(id: SchemaId) -> Self {
        Self {
            id,
            parent: None,
            title: None,
            description: None,
            fields: ViewConfig::default(),
            views: BTreeMap::new(),
            view_specs: Vec::new(),
            validators: Vec::new(),
            discriminated_field: None,
            discriminated_type: None,
            is_discriminated_base: false,
            discriminator_base: None,
            methods: BTreeMap::new(),
            finalized: false,
        }
    }

    /// The named view, or all fields for `None`.
    pub fn view(&self, name: Option<&str>) -> Result<&ViewConfig, SchemaError> {
        match name {
            None => Ok(&self.fields),
            Some(view) => self.views.get(view).ok_or_else(|| SchemaError::UnknownView {
                schema: self.id.to_string(),
                view: view.to_string(),
            }),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn method(&self, name: &str) -> Result<&MethodConfig, SchemaError> {
        self.methods.get(name).ok_or_else(|| SchemaError::UnknownMethod {
            schema: self.id.to_string(),
            method: name.to_string(),
        })
    }

    pub fn has_async_validators(&self) -> bool {
        self.validators.iter().any(ClassValidator::is_async)
    }

    /// String this type registers under in its base's discriminator map.
    ///
    /// The explicit discriminator if one was declared; otherwise, for
    /// non-base members of a discriminated family, the type name split on
    /// case boundaries and joined with `_`.
    pub fn discriminator_value(&self) -> Option<String> {
        self.discriminated_field.as_ref()?;
        match &self.discriminated_type {
            Some(explicit) => Some(explicit.clone()),
            None if self.is_discriminated_base => None,
            None => Some(snake_case(self.id.as_str())),
        }
    }
}

/// `SportsCar` → `sports_car`, `HTTPServer` → `http_server`.
pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                out.push('_');
            }
        }
        if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}
