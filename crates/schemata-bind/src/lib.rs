//! # schemata-bind — Binding Engine
//!
//! Turns loosely-typed input (parsed JSON, query maps, CLI arguments) into
//! [`Instance`](schemata_core::Instance)s of registered schemas.
//!
//! ```
//! use schemata_bind::{BindOptions, Binder};
//! use schemata_core::{SchemaId, Value};
//! use schemata_registry::{FieldFacts, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new();
//! let person = SchemaId::new("Person").unwrap();
//! registry
//!     .get_for_register(&person)
//!     .register_field("name", FieldFacts::new().string().required())
//!     .register_field("age", FieldFacts::new().integer().min(0));
//! registry.finalize().unwrap();
//!
//! let raw = Value::from(serde_json::json!({"name": "Ann", "age": "19.9"}));
//! let bound = Binder::new(&registry).bind(&person, raw, &BindOptions::new()).unwrap().unwrap();
//! assert_eq!(bound.get("age"), Some(&Value::Int(19)));
//! ```

pub mod binder;
pub mod options;

pub use binder::Binder;
pub use options::BindOptions;
