//! # schemata-validate — Validation Engine
//!
//! Checks instances against the constraints declared in a
//! [`SchemaRegistry`](schemata_registry::SchemaRegistry) and reports every
//! failure at once, each addressed by its path (`home.street`,
//! `previous[1].zip`, `[3].name`).
//!
//! ## Entry Points
//!
//! - [`SchemaValidator::validate`] / [`SchemaValidator::validate_async`]
//! - [`SchemaValidator::validate_partial`] skips `required` checks.
//! - [`SchemaValidator::validate_all`] validates a list in one pass.
//! - [`SchemaValidator::validate_method`] validates positional arguments
//!   against a method's declared parameters.
//!
//! ```
//! use schemata_core::{Instance, SchemaId};
//! use schemata_registry::{FieldFacts, SchemaRegistry};
//! use schemata_validate::SchemaValidator;
//!
//! let registry = SchemaRegistry::new();
//! let person = SchemaId::new("Person").unwrap();
//! registry
//!     .get_for_register(&person)
//!     .register_field("name", FieldFacts::new().string().required());
//! registry.finalize().unwrap();
//!
//! let err = SchemaValidator::new(&registry)
//!     .validate(&person, &Instance::new(person.clone()), None)
//!     .unwrap_err();
//! let violations = err.violations().unwrap();
//! assert_eq!(violations.violations()[0].message, "name is required");
//! ```

pub mod engine;
pub mod messages;
pub mod patterns;

pub use engine::SchemaValidator;
pub use messages::MessageCatalog;
pub use patterns::PatternCatalog;
