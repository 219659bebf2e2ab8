//! Integration tests: validation scenarios against a registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use regex::Regex;
use schemata_bind::{BindOptions, Binder};
use schemata_core::{ErrorKind, Instance, SchemaError, SchemaId, ValidatorFailure, Value, Violation};
use schemata_registry::{ClassFacts, FieldFacts, PointAdapter, SchemaRegistry};
use schemata_validate::{MessageCatalog, SchemaValidator};
use serde_json::json;

fn id(name: &str) -> SchemaId {
    SchemaId::new(name).unwrap()
}

fn instance(schema: &str, json: serde_json::Value) -> Instance {
    let fields = Value::from(json).as_map().cloned().unwrap();
    Instance::with_fields(id(schema), fields)
}

fn registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry
        .get_for_register(&id("Address"))
        .register_field("street", FieldFacts::new().string().required())
        .register_field("zip", FieldFacts::new().string().postal_code());
    registry
        .get_for_register(&id("Person"))
        .register(ClassFacts::new().view_with("public", ["name"]))
        .register_field("name", FieldFacts::new().string().required())
        .register_field("age", FieldFacts::new().integer().min(0).max(150))
        .register_field("email", FieldFacts::new().string().email())
        .register_field("code", FieldFacts::new().string().matches(Regex::new("^[A-Z]+$").unwrap()).min_length(3))
        .register_field("size", FieldFacts::new().string().one_of(["s", "m"]))
        .register_field("tags", FieldFacts::new().string().array().max_length(3))
        .register_field("born", FieldFacts::new().date().min(Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()))
        .register_field("home", FieldFacts::new().schema(id("Address")))
        .register_field("previous", FieldFacts::new().schema(id("Address")).array())
        .register_field("location", FieldFacts::new().adapter(Arc::new(PointAdapter)))
        .register_parameter("rename", 0, FieldFacts::new().string().required().named("name"))
        .register_parameter("rename", 1, FieldFacts::new().schema(id("Address")));
    registry
        .get_for_register(&id("Shape"))
        .register(ClassFacts::new().discriminated_by("kind"))
        .register_field("kind", FieldFacts::new().string());
    registry
        .get_for_register(&id("Circle"))
        .register(ClassFacts::new().extends(id("Shape")))
        .register_field("radius", FieldFacts::new().number().min(0));
    registry
        .get_for_register(&id("Drawing"))
        .register_field("shapes", FieldFacts::new().schema(id("Shape")).array());
    registry.finalize().unwrap();
    registry
}

fn violations(result: Result<(), SchemaError>) -> Vec<Violation> {
    match result {
        Err(SchemaError::Validation(aggregate)) => aggregate.into_inner(),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

fn paths(found: &[Violation]) -> Vec<(&str, &str)> {
    found.iter().map(|v| (v.path.as_str(), v.kind.as_str())).collect()
}

#[test]
fn test_bound_person_is_valid() {
    let registry = registry();
    let person = Binder::new(&registry)
        .bind_json(&id("Person"), json!({"name": "Ann galaxies", "age": "19.9"}), &BindOptions::new())
        .unwrap()
        .unwrap();
    assert_eq!(person.get("age"), Some(&Value::Int(19)));
    SchemaValidator::new(&registry).validate(&id("Person"), &person, None).unwrap();
}

#[test]
fn test_missing_required_field() {
    let registry = registry();
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &instance("Person", json!({})), None));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, "name");
    assert_eq!(found[0].kind, ErrorKind::Required);
    assert_eq!(found[0].message, "name is required");

    let blank = instance("Person", json!({"name": ""}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &blank, None));
    assert_eq!(paths(&found), vec![("name", "required")]);
}

#[test]
fn test_independent_checks_all_report() {
    let registry = registry();
    let person = instance("Person", json!({"name": "Ann", "code": "ab"}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("code", "match"), ("code", "minlength")]);
    assert_eq!(found[0].regex.as_deref(), Some("^[A-Z]+$"));
    assert_eq!(found[1].message, "code is not long enough (3)");
}

#[test]
fn test_type_mismatch_suppresses_further_checks() {
    let registry = registry();
    let person = instance("Person", json!({"name": "Ann", "age": "old"}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("age", "type")]);
    assert_eq!(found[0].message, "age is not a valid number");
}

#[test]
fn test_named_patterns_enums_and_ranges() {
    let registry = registry();
    let person = instance(
        "Person",
        json!({"name": "Ann", "email": "nope", "size": "xl", "age": 200}),
    );
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("age", "max"), ("email", "match"), ("size", "enum")]);
    assert_eq!(found[0].message, "age is greater than (150)");
    assert_eq!(found[1].message, "email is not a valid email address");
    assert_eq!(found[1].regex.as_deref(), Some("email"));
    assert_eq!(found[2].message, "size is only allowed to be \"s or m\"");
}

#[test]
fn test_date_limits() {
    let registry = registry();
    let person = Binder::new(&registry)
        .bind_json(&id("Person"), json!({"name": "Old", "born": "1850-03-01"}), &BindOptions::new())
        .unwrap()
        .unwrap();
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("born", "min")]);
    assert!(matches!(found[0].limit, Some(Value::Date(_))));
}

#[test]
fn test_array_and_nested_paths() {
    let registry = registry();
    let person = instance(
        "Person",
        json!({
            "name": "Ann",
            "tags": ["a", "b", "c", "d"],
            "home": {"zip": "123"},
            "previous": [{"street": "Old"}, {"zip": "12345"}],
        }),
    );
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(
        paths(&found),
        vec![
            ("tags", "maxlength"),
            ("home.street", "required"),
            ("home.zip", "match"),
            ("previous[1].street", "required"),
        ]
    );
    assert_eq!(found[2].message, "home.zip is not a valid postal code");
}

#[test]
fn test_non_array_value_for_array_field() {
    let registry = registry();
    let person = instance("Person", json!({"name": "Ann", "tags": "a"}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("tags", "type")]);
    assert_eq!(found[0].type_name.as_deref(), Some("array"));
}

#[test]
fn test_adapter_predicate() {
    let registry = registry();
    let person = instance("Person", json!({"name": "Ann", "location": "somewhere"}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Person"), &person, None));
    assert_eq!(paths(&found), vec![("location", "type")]);
    assert_eq!(found[0].type_name.as_deref(), Some("point"));

    let person = instance("Person", json!({"name": "Ann", "location": [1.0, 2.0]}));
    SchemaValidator::new(&registry).validate(&id("Person"), &person, None).unwrap();
}

#[test]
fn test_views_limit_checked_fields() {
    let registry = registry();
    let person = instance("Person", json!({"name": "Ann", "age": -1}));
    let validator = SchemaValidator::new(&registry);
    validator.validate(&id("Person"), &person, Some("public")).unwrap();
    assert!(validator.validate(&id("Person"), &person, None).is_err());
    assert!(matches!(
        validator.validate(&id("Person"), &person, Some("admin")),
        Err(SchemaError::UnknownView { .. })
    ));
}

#[test]
fn test_partial_validation_skips_required() {
    let registry = registry();
    let validator = SchemaValidator::new(&registry);
    validator
        .validate_partial(&id("Person"), &instance("Person", json!({"home": {}})), None)
        .unwrap();
    let found = violations(validator.validate_partial(&id("Person"), &instance("Person", json!({"age": -5})), None));
    assert_eq!(paths(&found), vec![("age", "min")]);
}

#[test]
fn test_validate_all_prefixes_indices() {
    let registry = registry();
    let people = [
        instance("Person", json!({"name": "Ann"})),
        instance("Person", json!({"age": 3})),
        instance("Person", json!({"name": "Bo", "home": {"street": ""}})),
    ];
    let found = violations(SchemaValidator::new(&registry).validate_all(&id("Person"), &people, None));
    assert_eq!(paths(&found), vec![("[1].name", "required"), ("[2].home.street", "required")]);
}

#[test]
fn test_custom_messages() {
    let registry = registry();
    let mut messages = MessageCatalog::new();
    messages.set("required", "please provide {path}");
    let found = violations(
        SchemaValidator::new(&registry)
            .with_messages(messages)
            .validate(&id("Person"), &instance("Person", json!({})), None),
    );
    assert_eq!(found[0].message, "please provide name");
}

#[test]
fn test_explicit_constraint_messages_are_rendered() {
    let registry = SchemaRegistry::new();
    registry
        .get_for_register(&id("Adult"))
        .register_field("age", FieldFacts::new().integer().min_with(18, "{path} must be at least {limit}"))
        .register_field("name", FieldFacts::new().string().required_with("who are you?"));
    registry.finalize().unwrap();
    let found = violations(SchemaValidator::new(&registry).validate(&id("Adult"), &instance("Adult", json!({"age": 9})), None));
    assert_eq!(found[0].message, "age must be at least 18");
    assert_eq!(found[1].message, "who are you?");
}

#[test]
fn test_discriminated_elements_validate_as_concrete_type() {
    let registry = registry();
    let drawing = instance("Drawing", json!({"shapes": [{"kind": "circle", "radius": -1}]}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Drawing"), &drawing, None));
    assert_eq!(paths(&found), vec![("shapes[0].radius", "min")]);
}

#[test]
fn test_unmapped_discriminator_fails_the_pass() {
    let registry = registry();
    let drawing = instance("Drawing", json!({"shapes": [{"kind": "hexagon"}]}));
    let err = SchemaValidator::new(&registry).validate(&id("Drawing"), &drawing, None).unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedDiscriminator { value: Some(v), .. } if v == "hexagon"));
}

#[test]
fn test_base_typed_instance_resolves_its_discriminator() {
    let registry = registry();
    let validator = SchemaValidator::new(&registry);

    let hexagon = instance("Shape", json!({"kind": "hexagon"}));
    let err = validator.validate(&id("Shape"), &hexagon, None).unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedDiscriminator { value: Some(v), .. } if v == "hexagon"));

    let circle = instance("Shape", json!({"kind": "circle", "radius": -5}));
    let found = violations(validator.validate(&id("Shape"), &circle, None));
    assert_eq!(paths(&found), vec![("radius", "min")]);

    let mut nested = Instance::new(id("Drawing"));
    nested.set("shapes", Value::Array(vec![Value::Instance(circle)]));
    let found = violations(validator.validate(&id("Drawing"), &nested, None));
    assert_eq!(paths(&found), vec![("shapes[0].radius", "min")]);
}

#[test]
fn test_concrete_instance_keeps_its_own_type() {
    let registry = registry();
    let circle = instance("Circle", json!({"radius": -1}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Shape"), &circle, None));
    assert_eq!(paths(&found), vec![("radius", "min")]);
}

#[test]
fn test_method_arguments() {
    let registry = registry();
    let validator = SchemaValidator::new(&registry);
    let found = violations(validator.validate_method(&id("Person"), "rename", &[], &[]));
    assert_eq!(paths(&found), vec![("name", "required")]);

    let args = [Value::from("Ann"), Value::from(json!({"zip": "nope"}))];
    let found = violations(validator.validate_method(&id("Person"), "rename", &args, &["", ""]));
    assert_eq!(paths(&found), vec![("street", "required"), ("zip", "match")]);

    let found = violations(validator.validate_method(&id("Person"), "rename", &args, &["", "address"]));
    assert_eq!(paths(&found), vec![("address.street", "required"), ("address.zip", "match")]);
    assert_eq!(found[0].message, "address.street is required");

    assert!(matches!(
        validator.validate_method(&id("Person"), "delete", &[], &[]),
        Err(SchemaError::UnknownMethod { .. })
    ));
}

fn period_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry
        .get_for_register(&id("Period"))
        .register(ClassFacts::new().validator(|period: &Instance, _view: Option<&str>| {
            let start = period.get("start").and_then(Value::as_f64).unwrap_or_default();
            let end = period.get("end").and_then(Value::as_f64).unwrap_or_default();
            if end < start {
                Ok(vec![Violation::new("end", "order")])
            } else {
                Ok(Vec::new())
            }
        }))
        .register_field("start", FieldFacts::new().number())
        .register_field("end", FieldFacts::new().number());
    registry
        .get_for_register(&id("Booking"))
        .register(ClassFacts::new().validator(|booking: &Instance, _view: Option<&str>| {
            if booking.contains("guest") {
                Ok(Vec::new())
            } else {
                Err(ValidatorFailure::Invalid(vec![
                    Violation::new("guest", "missing_guest").with_message("a booking needs a guest"),
                ]))
            }
        }))
        .register_field("guest", FieldFacts::new().string())
        .register_field("period", FieldFacts::new().schema(id("Period")))
        .register_field("nights", FieldFacts::new().integer().min(1));
    registry.finalize().unwrap();
    registry
}

#[test]
fn test_class_validators_run_after_fields_innermost_first() {
    let registry = period_registry();
    let booking = instance("Booking", json!({"nights": 0, "period": {"start": 5, "end": 2}}));
    let found = violations(SchemaValidator::new(&registry).validate(&id("Booking"), &booking, None));
    assert_eq!(
        paths(&found),
        vec![("nights", "min"), ("period.end", "order"), ("guest", "missing_guest")]
    );
    assert_eq!(found[1].message, "period.end is not valid");
    assert_eq!(found[2].message, "a booking needs a guest");
}

#[test]
fn test_failing_validator_propagates() {
    let registry = SchemaRegistry::new();
    registry
        .get_for_register(&id("Flaky"))
        .register(ClassFacts::new().validator(|_: &Instance, _: Option<&str>| {
            Err(ValidatorFailure::Failed("lookup service unavailable".into()))
        }));
    registry.finalize().unwrap();
    let err = SchemaValidator::new(&registry)
        .validate(&id("Flaky"), &Instance::new(id("Flaky")), None)
        .unwrap_err();
    assert!(matches!(err, SchemaError::Validator(_)));
}

fn async_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry
        .get_for_register(&id("Account"))
        .register(ClassFacts::new().async_validator(|account: Instance, _view: Option<String>| async move {
            tokio::task::yield_now().await;
            if account.get("handle").and_then(Value::as_str) == Some("taken") {
                Ok(vec![Violation::new("handle", "unique")
                    .with_value(Value::from("taken"))
                    .with_message("{path} {value} is already in use")])
            } else {
                Ok(Vec::new())
            }
        }))
        .register_field("handle", FieldFacts::new().string().required());
    registry
        .get_for_register(&id("Team"))
        .register_field("owner", FieldFacts::new().schema(id("Account")));
    registry.finalize().unwrap();
    registry
}

#[test]
fn test_sync_validation_rejects_async_validators() {
    let registry = async_registry();
    let team = instance("Team", json!({"owner": {"handle": "free"}}));
    let err = SchemaValidator::new(&registry).validate(&id("Team"), &team, None).unwrap_err();
    assert!(matches!(err, SchemaError::AsyncValidatorRequired(schema) if schema == "Account"));
}

#[tokio::test]
async fn test_async_validators_are_awaited() {
    let registry = async_registry();
    let validator = SchemaValidator::new(&registry);
    let team = instance("Team", json!({"owner": {"handle": "taken"}}));
    let found = violations(validator.validate_async(&id("Team"), &team, None).await);
    assert_eq!(paths(&found), vec![("owner.handle", "unique")]);
    assert_eq!(found[0].message, "owner.handle taken is already in use");

    let free = instance("Team", json!({"owner": {"handle": "free"}}));
    validator.validate_async(&id("Team"), &free, None).await.unwrap();
}

#[tokio::test]
async fn test_async_partial_and_list_variants() {
    let registry = async_registry();
    let validator = SchemaValidator::new(&registry);
    validator
        .validate_partial_async(&id("Account"), &instance("Account", json!({})), None)
        .await
        .unwrap();
    let accounts = [
        instance("Account", json!({"handle": "free"})),
        instance("Account", json!({"handle": "taken"})),
    ];
    let found = violations(validator.validate_all_async(&id("Account"), &accounts, None).await);
    assert_eq!(paths(&found), vec![("[1].handle", "unique")]);
}

#[tokio::test]
async fn test_async_validators_run_in_declared_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = SchemaRegistry::new();
    let (slow, quick, last) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
    registry
        .get_for_register(&id("Ledger"))
        .register(ClassFacts::new().async_validator(move |_: Instance, _: Option<String>| {
            let log = Arc::clone(&slow);
            async move {
                log.lock().push("slow:start");
                tokio::time::sleep(Duration::from_millis(20)).await;
                log.lock().push("slow:end");
                Ok(vec![Violation::new("balance", "first")])
            }
        }))
        .register(ClassFacts::new().async_validator(move |_: Instance, _: Option<String>| {
            let log = Arc::clone(&quick);
            async move {
                log.lock().push("quick:start");
                tokio::task::yield_now().await;
                log.lock().push("quick:end");
                Ok(vec![Violation::new("balance", "second")])
            }
        }))
        .register(ClassFacts::new().validator(move |_: &Instance, _: Option<&str>| {
            last.lock().push("sync");
            Ok(vec![Violation::new("owner", "third")])
        }))
        .register_field("balance", FieldFacts::new().number());
    registry.finalize().unwrap();

    let ledger = instance("Ledger", json!({"balance": 1}));
    let found = violations(SchemaValidator::new(&registry).validate_async(&id("Ledger"), &ledger, None).await);
    assert_eq!(
        paths(&found),
        vec![("balance", "first"), ("balance", "second"), ("owner", "third")]
    );
    assert_eq!(*log.lock(), vec!["slow:start", "slow:end", "quick:start", "quick:end", "sync"]);
}
