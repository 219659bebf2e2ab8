//! # Message Templates
//!
//! Violation messages are rendered from per-kind templates with
//! `{path}`, `{type}`, `{limit}`, `{regex}` and `{value}` placeholders.
//! `match` violations whose pattern has a registered name use that name's
//! template instead. A constraint's explicit message replaces the template
//! but is rendered the same way.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use schemata_core::{ErrorKind, Value, Violation};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\{(\w+)\}") {
    Ok(re) => re,
    Err(e) => panic!("placeholder pattern failed to compile: {e}"),
});

const DEFAULT_KIND: &str = "default";

/// Templates keyed by violation kind and by pattern name.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    kinds: HashMap<String, String>,
    patterns: HashMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let kinds = [
            (DEFAULT_KIND, "{path} is not valid"),
            ("type", "{path} is not a valid {type}"),
            ("required", "{path} is required"),
            ("minlength", "{path} is not long enough ({limit})"),
            ("maxlength", "{path} is too long ({limit})"),
            ("match", "{path} should match {regex}"),
            ("min", "{path} is less than ({limit})"),
            ("max", "{path} is greater than ({limit})"),
            ("enum", "{path} is only allowed to be \"{limit}\""),
        ];
        let patterns = [
            ("email", "{path} is not a valid email address"),
            ("telephone", "{path} is not a valid phone number"),
            ("url", "{path} is not a valid url"),
            ("simple_name", "{path} is not a proper name"),
            ("postal_code", "{path} is not a valid postal code"),
        ];
        Self {
            kinds: kinds.iter().map(|(k, t)| (k.to_string(), t.to_string())).collect(),
            patterns: patterns.iter().map(|(k, t)| (k.to_string(), t.to_string())).collect(),
        }
    }
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the template for a violation kind (`"default"` for the
    /// fallback).
    pub fn set(&mut self, kind: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.kinds.insert(kind.into(), template.into());
        self
    }

    /// Replace the template for `match` violations of a named pattern.
    pub fn set_pattern(&mut self, name: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.patterns.insert(name.into(), template.into());
        self
    }

    /// Template a violation renders with when it carries no explicit message.
    pub fn template_for(&self, violation: &Violation) -> &str {
        if violation.kind == ErrorKind::Match {
            if let Some(template) = violation.regex.as_ref().and_then(|name| self.patterns.get(name)) {
                return template;
            }
        }
        self.kinds
            .get(violation.kind.as_str())
            .or_else(|| self.kinds.get(DEFAULT_KIND))
            .map_or("{path} is not valid", String::as_str)
    }

    /// Fill placeholders of `template` from the violation.
    pub fn render(&self, template: &str, violation: &Violation) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                let rendered = match &caps[1] {
                    "path" => Some(violation.path.clone()),
                    "type" => violation.type_name.clone(),
                    "regex" => violation.regex.clone(),
                    "value" => violation.value.as_ref().map(ToString::to_string),
                    "limit" => violation.limit.as_ref().map(|limit| render_limit(&violation.kind, limit)),
                    _ => None,
                };
                rendered.unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Set the violation's message from `explicit`, else from its template.
    pub fn fill(&self, violation: &mut Violation, explicit: Option<&str>) {
        let template = explicit.unwrap_or_else(|| self.template_for(violation)).to_string();
        violation.message = self.render(&template, violation);
    }
}

fn render_limit(kind: &ErrorKind, limit: &Value) -> String {
    match (kind, limit) {
        (ErrorKind::Enum, Value::Array(values)) => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or "),
        _ => limit.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_templates() {
        let catalog = MessageCatalog::new();
        let mut v = Violation::new("name", ErrorKind::MinLength).with_limit(Value::Int(3));
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "name is not long enough (3)");

        let mut v = Violation::new("age", ErrorKind::Type).with_type("number");
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "age is not a valid number");
    }

    #[test]
    fn test_enum_limit_joins_with_or() {
        let catalog = MessageCatalog::new();
        let mut v = Violation::new("size", ErrorKind::Enum)
            .with_limit(Value::Array(vec![Value::from("s"), Value::from("m")]));
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "size is only allowed to be \"s or m\"");
    }

    #[test]
    fn test_named_pattern_template() {
        let catalog = MessageCatalog::new();
        let mut v = Violation::new("contact", ErrorKind::Match).with_regex("email");
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "contact is not a valid email address");

        let mut v = Violation::new("code", ErrorKind::Match).with_regex("^[A-Z]+$");
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "code should match ^[A-Z]+$");
    }

    #[test]
    fn test_explicit_message_wins_and_is_rendered() {
        let catalog = MessageCatalog::new();
        let mut v = Violation::new("age", ErrorKind::Min)
            .with_limit(Value::Int(18))
            .with_value(Value::Int(3));
        catalog.fill(&mut v, Some("{path} must be at least {limit}, got {value}"));
        assert_eq!(v.message, "age must be at least 18, got 3");
    }

    #[test]
    fn test_custom_kinds_use_default_and_unknown_placeholders_survive() {
        let mut catalog = MessageCatalog::new();
        let mut v = Violation::new("dates", "order");
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "dates is not valid");

        catalog.set("order", "{path} is out of {sequence}");
        catalog.fill(&mut v, None);
        assert_eq!(v.message, "dates is out of {sequence}");
    }
}
