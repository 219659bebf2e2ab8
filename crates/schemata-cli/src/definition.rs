//! # Schema Definitions — YAML to Registration Calls
//!
//! Declarative schema files are the CLI's configuration. Each entry under
//! `schemas:` turns into the same registration calls a library user would
//! make, followed by one `finalize` for the whole file.
//!
//! ```yaml
//! schemas:
//!   Vehicle:
//!     discriminator: { field: kind, base: true }
//!     fields:
//!       - { name: kind, type: string }
//!       - { name: wheels, type: integer, min: 2, required: true }
//!   Truck:
//!     extends: Vehicle
//!     discriminator: { value: lorry }
//!     views:
//!       summary: { with: [kind, wheels] }
//!     fields:
//!       - name: plate
//!         type: string
//!         pattern: "^[A-Z0-9-]+$"
//!         messages: { match: "{path} is not a plate number" }
//! ```
//!
//! ## Field Types
//!
//! `string`, `number`, `integer`, `bigint`, `boolean`, `date`, `pattern`
//! (or `regexp`), `any`, `object` and `point`. Any other name refers to a
//! schema defined in the same registry.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use schemata_core::coerce::{compile_pattern, parse_date};
use schemata_core::{patterns, SchemaId, Value};
use schemata_registry::{
    ClassFacts, FieldFacts, Limit, MethodFacts, PointAdapter, RegistrationAdapter, SchemaRegistry, ViewSpec,
};
use serde::Deserialize;
use tracing::debug;

/// Root of a definitions file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    pub schemas: BTreeMap<String, SchemaDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discriminator: Option<DiscriminatorDefinition>,
    #[serde(default)]
    pub views: BTreeMap<String, ViewDefinition>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscriminatorDefinition {
    /// Field holding the discriminator string.
    #[serde(default)]
    pub field: Option<String>,
    /// Marks the base of a discriminated family.
    #[serde(default)]
    pub base: bool,
    /// Explicit discriminator string of this type.
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewDefinition {
    With(Vec<String>),
    Without(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDefinition {
    #[default]
    Normal,
    ReadOnly,
    WriteOnly,
}

/// A `min`/`max` bound: a number, or a date string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LimitDefinition {
    Number(f64),
    Date(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub array: bool,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub access: AccessDefinition,
    #[serde(default)]
    pub required: bool,
    /// Named pattern (`email`, `telephone`, `url`, `simple_name`,
    /// `postal_code`) or pattern source.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min: Option<LimitDefinition>,
    #[serde(default)]
    pub max: Option<LimitDefinition>,
    #[serde(default)]
    pub minlength: Option<usize>,
    #[serde(default)]
    pub maxlength: Option<usize>,
    #[serde(rename = "enum", default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit message templates keyed by violation kind.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDefinition {
    #[serde(default)]
    pub description: Option<String>,
    /// Positional parameters, in order.
    #[serde(default)]
    pub parameters: Vec<FieldDefinition>,
}

impl Definitions {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("failed to parse schema definitions")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid definitions in {}", path.display()))
    }

    /// Register every definition and finalize the batch.
    pub fn register(&self, registry: &SchemaRegistry) -> Result<Vec<SchemaId>> {
        for (name, schema) in &self.schemas {
            let id = SchemaId::new(name.as_str())?;
            let adapter = registry.get_for_register(&id);
            register_schema(&adapter, schema).with_context(|| format!("in schema '{name}'"))?;
        }
        let installed = registry.finalize().context("failed to finalize schema definitions")?;
        debug!(count = installed.len(), "definitions installed");
        Ok(installed)
    }

    /// A fresh registry holding these definitions.
    pub fn into_registry(self) -> Result<SchemaRegistry> {
        let registry = SchemaRegistry::new();
        self.register(&registry)?;
        Ok(registry)
    }
}

fn register_schema(adapter: &RegistrationAdapter<'_>, schema: &SchemaDefinition) -> Result<()> {
    let mut class = ClassFacts::new();
    if let Some(parent) = &schema.extends {
        class = class.extends(SchemaId::new(parent.as_str())?);
    }
    if let Some(title) = &schema.title {
        class = class.title(title);
    }
    if let Some(description) = &schema.description {
        class = class.description(description);
    }
    if let Some(discriminator) = &schema.discriminator {
        if let Some(field) = &discriminator.field {
            class = class.discriminator_field(field);
        }
        if discriminator.base {
            class = class.discriminated_base(true);
        }
        if let Some(value) = &discriminator.value {
            class = class.discriminator(value);
        }
    }
    for (name, view) in &schema.views {
        let spec = match view {
            ViewDefinition::With(fields) => ViewSpec::With(fields.clone()),
            ViewDefinition::Without(fields) => ViewSpec::Without(fields.clone()),
        };
        class = class.view(name, spec);
    }
    adapter.register(class);

    for field in &schema.fields {
        let facts = field_facts(field).with_context(|| format!("in field '{}'", field.name))?;
        adapter.register_field(field.name.as_str(), facts);
    }
    for (method, definition) in &schema.methods {
        let mut facts = MethodFacts::new();
        if let Some(description) = &definition.description {
            facts = facts.describe(description);
        }
        adapter.register_method(method.as_str(), facts);
        for (index, parameter) in definition.parameters.iter().enumerate() {
            let facts = field_facts(parameter)
                .with_context(|| format!("in parameter {index} of method '{method}'"))?
                .named(parameter.name.as_str());
            adapter.register_parameter(method.as_str(), index, facts);
        }
    }
    Ok(())
}

/// Translate one field definition into registration facts.
pub fn field_facts(field: &FieldDefinition) -> Result<FieldFacts> {
    let message = |kind: &str| field.messages.get(kind).cloned();
    let mut facts = with_type(FieldFacts::new(), field.field_type.as_deref())?;
    if field.array {
        facts = facts.array();
    }
    for alias in &field.aliases {
        facts = facts.alias(alias);
    }
    facts = match field.access {
        AccessDefinition::Normal => facts,
        AccessDefinition::ReadOnly => facts.read_only(),
        AccessDefinition::WriteOnly => facts.write_only(),
    };
    if field.required {
        facts = match message("required") {
            Some(text) => facts.required_with(text),
            None => facts.required(),
        };
    }
    if let Some(source) = &field.pattern {
        let pattern = patterns::common()
            .into_iter()
            .find(|(name, _)| *name == source.as_str())
            .map(|(_, re)| re.clone())
            .or_else(|| compile_pattern(source))
            .ok_or_else(|| anyhow!("invalid pattern {source:?}"))?;
        facts = match message("match") {
            Some(text) => facts.matches_with(pattern, text),
            None => facts.matches(pattern),
        };
    }
    if let Some(limit) = &field.min {
        let limit = to_limit(limit)?;
        facts = match message("min") {
            Some(text) => facts.min_with(limit, text),
            None => facts.min(limit),
        };
    }
    if let Some(limit) = &field.max {
        let limit = to_limit(limit)?;
        facts = match message("max") {
            Some(text) => facts.max_with(limit, text),
            None => facts.max(limit),
        };
    }
    if let Some(limit) = field.minlength {
        facts = match message("minlength") {
            Some(text) => facts.min_length_with(limit, text),
            None => facts.min_length(limit),
        };
    }
    if let Some(limit) = field.maxlength {
        facts = match message("maxlength") {
            Some(text) => facts.max_length_with(limit, text),
            None => facts.max_length(limit),
        };
    }
    if !field.values.is_empty() {
        facts = facts.one_of(field.values.iter().cloned().map(Value::from));
        if let Some(text) = message("enum") {
            facts = facts.enum_message(text);
        }
    }
    facts = match (field.precision, field.decimals) {
        (Some(digits), decimals) => facts.precision(digits, decimals.unwrap_or(0)),
        (None, Some(decimals)) => facts.decimals(decimals),
        (None, None) => facts,
    };
    if let Some(default) = &field.default {
        facts = facts.default_value(Value::from(default.clone()));
    }
    if let Some(description) = &field.description {
        facts = facts.describe(description);
    }
    Ok(facts)
}

fn with_type(facts: FieldFacts, name: Option<&str>) -> Result<FieldFacts> {
    Ok(match name.unwrap_or("any") {
        "string" => facts.string(),
        "number" => facts.number(),
        "integer" => facts.integer(),
        "bigint" => facts.bigint(),
        "boolean" => facts.boolean(),
        "date" => facts.date(),
        "pattern" | "regexp" => facts.regexp(),
        "any" => facts.any(),
        "object" => facts.object(),
        "point" => facts.adapter(Arc::new(PointAdapter)),
        schema => facts.schema(SchemaId::new(schema)?),
    })
}

fn to_limit(limit: &LimitDefinition) -> Result<Limit> {
    match limit {
        LimitDefinition::Number(n) => Ok(Limit::Number(*n)),
        LimitDefinition::Date(text) => parse_date(text)
            .map(Limit::Date)
            .ok_or_else(|| anyhow!("invalid date limit {text:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEHICLES: &str = r#"
schemas:
  Vehicle:
    discriminator: { field: kind, base: true }
    fields:
      - { name: kind, type: string }
      - { name: wheels, type: integer, min: 2, required: true }
  Truck:
    extends: Vehicle
    discriminator: { value: lorry }
    views:
      summary: { with: [kind, wheels] }
    fields:
      - name: plate
        type: string
        pattern: "^[A-Z0-9-]+$"
        messages: { match: "{path} is not a plate number" }
      - { name: registered, type: date, min: "2000-01-01" }
    methods:
      load:
        description: Load cargo
        parameters:
          - { name: weight, type: number, required: true, max: 40000 }
"#;

    #[test]
    fn test_definitions_register_and_finalize() {
        let registry = Definitions::from_yaml(VEHICLES).unwrap().into_registry().unwrap();
        let truck = SchemaId::new("Truck").unwrap();
        let vehicle = SchemaId::new("Vehicle").unwrap();
        assert!(registry.is_assignable(&truck, &vehicle));
        assert_eq!(registry.discriminators(&vehicle).get("lorry"), Some(&truck));

        let summary = registry.get_fields(&truck, Some("summary")).unwrap();
        assert_eq!(summary.names(), ["kind", "wheels"]);

        let config = registry.get(&truck).unwrap();
        let plate = config.field("plate").unwrap();
        assert_eq!(
            plate.pattern.as_ref().and_then(|p| p.message.as_deref()),
            Some("{path} is not a plate number")
        );
        assert!(matches!(config.field("registered").and_then(|f| f.min.as_ref()).map(|r| r.limit), Some(Limit::Date(_))));

        let load = registry.get_method(&truck, "load").unwrap();
        assert_eq!(load.description.as_deref(), Some("Load cargo"));
        assert_eq!(load.parameter(0).map(|p| p.field.name.as_str()), Some("weight"));
    }

    #[test]
    fn test_named_patterns_resolve_to_the_catalog() {
        let field = FieldDefinition {
            name: "contact".into(),
            field_type: Some("string".into()),
            pattern: Some("email".into()),
            ..FieldDefinition::default()
        };
        let config = field_facts(&field).unwrap().build(SchemaId::new("T").unwrap(), "contact");
        assert_eq!(
            config.pattern.map(|p| p.pattern.as_str().to_string()),
            Some(patterns::EMAIL.as_str().to_string())
        );
    }

    #[test]
    fn test_rejects_bad_definitions() {
        assert!(Definitions::from_yaml("schemas:\n  A:\n    colour: red\n").is_err());
        let bad_date = FieldDefinition {
            name: "at".into(),
            min: Some(LimitDefinition::Date("someday".into())),
            ..FieldDefinition::default()
        };
        assert!(field_facts(&bad_date).is_err());
    }

    #[test]
    fn test_duplicate_discriminators_fail_registration() {
        let yaml = r#"
schemas:
  Base:
    discriminator: { field: kind, base: true }
  A: { extends: Base, discriminator: { value: x } }
  B: { extends: Base, discriminator: { value: x } }
"#;
        let err = Definitions::from_yaml(yaml).unwrap().into_registry().unwrap_err();
        assert!(format!("{err:#}").contains("claimed by both"));
    }
}
