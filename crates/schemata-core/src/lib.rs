//! # schemata-core — Foundational Types for the Schemata Engine
//!
//! This crate is the leaf of the Schemata workspace. Every other crate
//! depends on it; it depends on nothing internal.
//!
//! ## Contents
//!
//! - [`Value`] / [`Instance`] — the dynamically-typed value model used for
//!   raw input (parsed JSON, query maps, CLI arguments) and bound objects.
//! - [`SchemaId`] — validated identity of a registered type.
//! - [`SchemaError`] — the single error taxonomy shared by registry,
//!   binding, and validation.
//! - [`Violation`] / [`AggregateValidationError`] — the path-addressed
//!   validation error shape.
//! - [`coerce`] — best-effort conversion of raw values to target types.
//! - [`deep_assign`] — deep-merge under the four [`MergeMode`]s.
//! - [`expand_paths`] / [`flatten_paths`] — dotted/bracket path notation.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `schemata-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod coerce;
pub mod error;
pub mod merge;
pub mod paths;
pub mod patterns;
pub mod value;
pub mod violation;

pub use coerce::{coerce, CoerceTarget};
pub use error::SchemaError;
pub use merge::{deep_assign, MergeMode};
pub use paths::{expand_paths, flatten_paths};
pub use value::{Instance, Map, SchemaId, Value};
pub use violation::{AggregateValidationError, ErrorKind, ValidatorFailure, Violation};
