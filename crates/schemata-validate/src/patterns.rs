//! Named patterns.
//!
//! `match` violations report the pattern's registered name in their `regex`
//! slot (so messages can say "is not a valid email address") and fall back
//! to the pattern source for anonymous patterns. Patterns are identified by
//! source text.

use regex::Regex;
use schemata_core::patterns;

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    entries: Vec<(String, Regex)>,
}

impl Default for PatternCatalog {
    /// The common patterns: `email`, `telephone`, `url`, `simple_name`,
    /// `postal_code`.
    fn default() -> Self {
        Self {
            entries: patterns::common()
                .into_iter()
                .map(|(name, re)| (name.to_string(), re.clone()))
                .collect(),
        }
    }
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with no names.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register (or rename) a pattern.
    pub fn register(&mut self, name: impl Into<String>, pattern: Regex) -> &mut Self {
        let name = name.into();
        self.entries
            .retain(|(existing, re)| *existing != name && re.as_str() != pattern.as_str());
        self.entries.push((name, pattern));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Regex> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, re)| re)
    }

    pub fn name_of(&self, pattern: &Regex) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, re)| re.as_str() == pattern.as_str())
            .map(|(name, _)| name.as_str())
    }

    /// Name of `pattern` if registered, else its source.
    pub fn describe(&self, pattern: &Regex) -> String {
        self.name_of(pattern).unwrap_or(pattern.as_str()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_patterns_are_named() {
        let catalog = PatternCatalog::new();
        assert_eq!(catalog.name_of(&patterns::EMAIL), Some("email"));
        assert_eq!(catalog.name_of(&patterns::POSTAL_CODE), Some("postal_code"));
        assert!(catalog.get("url").is_some());
    }

    #[test]
    fn test_anonymous_patterns_describe_as_source() {
        let catalog = PatternCatalog::new();
        let re = Regex::new("^[a-z]+$").unwrap();
        assert_eq!(catalog.describe(&re), "^[a-z]+$");
    }

    #[test]
    fn test_register_replaces_name_and_source() {
        let mut catalog = PatternCatalog::empty();
        catalog.register("lower", Regex::new("^[a-z]+$").unwrap());
        catalog.register("lowercase", Regex::new("^[a-z]+$").unwrap());
        assert!(catalog.get("lower").is_none());
        assert_eq!(catalog.name_of(&Regex::new("^[a-z]+$").unwrap()), Some("lowercase"));
    }
}
