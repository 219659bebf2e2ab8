//! # schemata-cli — Schemata Command-Line Interface
//!
//! ## Subcommands
//!
//! - `check` — bind and validate a JSON document against YAML schema
//!   definitions
//! - `expand` — flat path map to nested document
//! - `flatten` — nested document to flat path map
//!
//! Argument parsing lives in `main.rs`; handlers return the process exit
//! code and delegate to the library crates.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

pub mod check;
pub mod definition;
pub mod transform;

/// Read a JSON document from `path`, or from stdin when `path` is `None`
/// or `-`.
pub fn read_json(path: Option<&Path>) -> Result<serde_json::Value> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            serde_json::from_str(&text).context("invalid JSON on stdin")
        }
    }
}
