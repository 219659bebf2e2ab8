//! # schemata-registry — Schema Metadata Store
//!
//! Holds the per-type metadata that binding and validation consult.
//!
//! ## Registration
//!
//! The type declaration mechanism is external: a program describes each
//! type once through explicit registration calls, then finalizes.
//!
//! ```
//! use schemata_core::SchemaId;
//! use schemata_registry::{ClassFacts, FieldFacts, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new();
//! let person = SchemaId::new("Person").unwrap();
//! registry
//!     .get_for_register(&person)
//!     .register(ClassFacts::new().view_with("public", ["name"]))
//!     .register_field("name", FieldFacts::new().string().required())
//!     .register_field("age", FieldFacts::new().integer().min(0));
//! registry.finalize().unwrap();
//!
//! assert!(registry.has(&person));
//! assert_eq!(registry.get_fields(&person, Some("public")).unwrap().names(), ["name"]);
//! ```
//!
//! ## Modules
//!
//! - [`field`] — field facts and frozen field configs.
//! - [`schema`] — class facts, views, methods, validators, schema configs.
//! - [`registry`] — the store, finalize, discriminator resolution.
//! - [`tracker`] — embedding graph and change events.
//! - [`adapter`] — custom value types.

pub mod adapter;
pub mod field;
pub mod registry;
pub mod schema;
pub mod tracker;

pub use adapter::{PointAdapter, TypeAdapter};
pub use field::{
    Access, EnumRule, FieldConfig, FieldFacts, FieldType, LengthRule, Limit, MatchRule, Precision, RangeRule,
    Required,
};
pub use registry::{RegistrationAdapter, SchemaRegistry};
pub use schema::{
    ClassFacts, ClassValidator, MethodConfig, MethodFacts, ParameterConfig, SchemaConfig, ValidatorFuture,
    ValidatorResult, ViewConfig, ViewSpec,
};
pub use tracker::{
    ChangeTracker, Dependent, FieldChange, FieldChangeEvent, SchemaChangeEvent, SubSchemaChange,
};
