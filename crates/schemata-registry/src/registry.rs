//! # Schema Registry — Pending and Installed Configs
//!
//! The registry stores one config per schema type across a two-phase
//! lifecycle:
//!
//! 1. **Registration.** [`SchemaRegistry::get_for_register`] hands out a
//!    [`RegistrationAdapter`] scoped to one type. Its calls merge class,
//!    field, parameter and method facts into a *pending* entry.
//! 2. **Finalize.** [`SchemaRegistry::finalize`] turns every pending entry
//!    into an immutable, installed [`SchemaConfig`]: parent facts merged in
//!    first, views derived, discriminators registered. The whole batch is
//!    published in one write section, so readers see either the old or the
//!    new configs, never a mix.
//!
//! [`SchemaRegistry::remove`] expires an installed config (hot reload). A
//! later finalize of the same type installs the replacement and fires change
//! events through the [`ChangeTracker`].
//!
//! ## Concurrency
//!
//! All state sits behind one `parking_lot::RwLock`. No lock is held while
//! change handlers run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use schemata_core::{Map, SchemaError, SchemaId};
use tracing::{debug, trace, warn};

use crate::field::FieldFacts;
use crate::schema::{ClassFacts, MethodConfig, MethodFacts, ParameterConfig, SchemaConfig, ViewConfig, ViewSpec};
use crate::tracker::{ChangeTracker, FieldChangeEvent, SchemaChangeEvent};

/// Registration facts collected for a type that is not finalized yet.
#[derive(Debug, Clone, Default)]
struct PendingSchema {
    class: ClassFacts,
    fields: Vec<(String, FieldFacts)>,
    methods: BTreeMap<String, PendingMethod>,
}

#[derive(Debug, Clone, Default)]
struct PendingMethod {
    facts: MethodFacts,
    parameters: BTreeMap<usize, FieldFacts>,
}

#[derive(Debug, Default)]
struct RegistryState {
    pending: HashMap<SchemaId, PendingSchema>,
    /// Registration order of pending types.
    pending_order: Vec<SchemaId>,
    installed: HashMap<SchemaId, Arc<SchemaConfig>>,
    expired: HashMap<SchemaId, Arc<SchemaConfig>>,
    /// Base type → discriminator string → concrete type.
    discriminators: HashMap<SchemaId, BTreeMap<String, SchemaId>>,
}

/// Store of schema metadata.
///
/// Cheap to share by reference; every method takes `&self`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    state: RwLock<RegistryState>,
    tracker: ChangeTracker,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration ---------------------------------------------------------

    /// Registration adapter for `id`, creating its pending entry if absent.
    pub fn get_for_register(&self, id: &SchemaId) -> RegistrationAdapter<'_> {
        self.with_pending(id, |_| {});
        RegistrationAdapter {
            registry: self,
            id: id.clone(),
        }
    }

    fn with_pending(&self, id: &SchemaId, f: impl FnOnce(&mut PendingSchema)) {
        let mut state = self.state.write();
        if !state.pending.contains_key(id) {
            debug!(schema = %id, "opening registration");
            state.pending_order.push(id.clone());
        }
        f(state.pending.entry(id.clone()).or_default());
    }

    /// Finalize every pending type, parents first, and publish the batch.
    ///
    /// Returns the ids installed by this call.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnknownField`] if a view names a missing field.
    /// - [`SchemaError::DuplicateDiscriminator`] if two types claim the same
    ///   discriminator string under one base.
    ///
    /// On error nothing is published and the pending entries are kept.
    pub fn finalize(&self) -> Result<Vec<SchemaId>, SchemaError> {
        let mut published = Vec::new();
        let mut redefined = Vec::new();
        {
            let mut state = self.state.write();
            if state.pending_order.is_empty() {
                return Ok(Vec::new());
            }
            let order = parents_first(&state);
            let mut built: HashMap<SchemaId, Arc<SchemaConfig>> = HashMap::new();

            for id in &order {
                let Some(pending) = state.pending.get(id) else { continue };
                let parent = match &pending.class.parent {
                    Some(parent_id) => {
                        let found = built
                            .get(parent_id)
                            .or_else(|| state.installed.get(parent_id))
                            .cloned();
                        if found.is_none() {
                            warn!(schema = %id, parent = %parent_id, "parent schema is not installed; finalizing without inherited facts");
                        }
                        found
                    }
                    None => None,
                };
                let mut config = assemble(id, pending, parent.as_deref());
                derive_views(&mut config)?;
                config.finalized = true;
                trace!(schema = %id, fields = config.fields.len(), views = config.views.len(), "assembled schema");
                built.insert(id.clone(), Arc::new(config));
            }

            let mut discriminators = state.discriminators.clone();
            for map in discriminators.values_mut() {
                map.retain(|_, concrete| !built.contains_key(concrete));
            }
            for id in &order {
                let Some(config) = built.get(id) else { continue };
                let Some(value) = config.discriminator_value() else { continue };
                let base = config.discriminator_base.clone().unwrap_or_else(|| id.clone());
                let family = discriminators.entry(base.clone()).or_default();
                if let Some(existing) = family.get(&value) {
                    if existing != id {
                        return Err(SchemaError::DuplicateDiscriminator {
                            base: base.to_string(),
                            value,
                            existing: existing.to_string(),
                            incoming: id.to_string(),
                        });
                    }
                }
                debug!(schema = %id, base = %base, discriminator = %value, "registering discriminator");
                family.insert(value, id.clone());
            }

            for id in order {
                let Some(config) = built.remove(&id) else { continue };
                state.pending.remove(&id);
                let expired = state.expired.remove(&id);
                let prior = state.installed.insert(id.clone(), Arc::clone(&config)).or(expired);
                if let Some(prior) = prior {
                    redefined.push((prior, Arc::clone(&config)));
                }
                published.push(config);
            }
            state.pending_order.clear();
            state.discriminators = discriminators;
        }

        for config in &published {
            self.tracker.track(config);
        }
        for (before, after) in &redefined {
            self.tracker.notify(before, after);
        }
        let ids: Vec<SchemaId> = published.iter().map(|c| c.id.clone()).collect();
        debug!(count = ids.len(), redefined = redefined.len(), "finalized schemas");
        Ok(ids)
    }

    /// Expire an installed schema. Returns false if it was not installed.
    pub fn remove(&self, id: &SchemaId) -> bool {
        let removed = {
            let mut state = self.state.write();
            match state.installed.remove(id) {
                Some(config) => {
                    for family in state.discriminators.values_mut() {
                        family.retain(|_, concrete| concrete != id);
                    }
                    state.expired.insert(id.clone(), config);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.tracker.forget(id);
            debug!(schema = %id, "removed schema");
        }
        removed
    }

    // -- Queries --------------------------------------------------------------

    /// True only for installed, non-expired schemas.
    pub fn has(&self, id: &SchemaId) -> bool {
        self.state.read().installed.contains_key(id)
    }

    /// The installed config, or a provisional snapshot of pending facts.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NotRegistered`] if the type is neither installed nor
    /// pending.
    pub fn get(&self, id: &SchemaId) -> Result<Arc<SchemaConfig>, SchemaError> {
        let state = self.state.read();
        if let Some(config) = state.installed.get(id) {
            return Ok(Arc::clone(config));
        }
        let Some(pending) = state.pending.get(id) else {
            return Err(SchemaError::NotRegistered(id.to_string()));
        };
        let parent = pending
            .class
            .parent
            .as_ref()
            .and_then(|p| state.installed.get(p))
            .map(Arc::as_ref);
        let mut config = assemble(id, pending, parent);
        if let Err(err) = derive_views(&mut config) {
            debug!(schema = %id, error = %err, "provisional views incomplete");
        }
        Ok(Arc::new(config))
    }

    /// Fields of a view (`None` for all fields).
    pub fn get_fields(&self, id: &SchemaId, view: Option<&str>) -> Result<ViewConfig, SchemaError> {
        self.get(id)?.view(view).cloned()
    }

    pub fn get_method(&self, id: &SchemaId, method: &str) -> Result<MethodConfig, SchemaError> {
        self.get(id)?.method(method).cloned()
    }

    /// Installed schema ids, sorted.
    pub fn ids(&self) -> Vec<SchemaId> {
        let mut ids: Vec<SchemaId> = self.state.read().installed.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn parent_of(&self, id: &SchemaId) -> Option<SchemaId> {
        parent_in(&self.state.read(), id)
    }

    /// True when `from` is `to` or inherits from it.
    pub fn is_assignable(&self, from: &SchemaId, to: &SchemaId) -> bool {
        let state = self.state.read();
        let mut seen = HashSet::new();
        let mut current = Some(from.clone());
        while let Some(id) = current {
            if id == *to {
                return true;
            }
            if !seen.insert(id.clone()) {
                return false;
            }
            current = parent_in(&state, &id);
        }
        false
    }

    /// Discriminator map of a base type.
    pub fn discriminators(&self, base: &SchemaId) -> BTreeMap<String, SchemaId> {
        self.state.read().discriminators.get(base).cloned().unwrap_or_default()
    }

    /// Concrete type to bind or validate `data` as, when `requested` heads a
    /// discriminated family.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UnresolvedDiscriminator`] if no discriminator value
    ///   is available or the value is not mapped.
    /// - [`SchemaError::TypeMismatch`] if the mapped type does not inherit
    ///   from `requested`.
    pub fn resolve_instance_type(&self, requested: &SchemaId, data: &Map) -> Result<SchemaId, SchemaError> {
        let config = self.get(requested)?;
        let Some(field) = &config.discriminated_field else {
            return Ok(requested.clone());
        };
        let value = data
            .get(field)
            .filter(|v| !v.is_absent())
            .map(ToString::to_string)
            .or_else(|| config.discriminator_value());
        let Some(value) = value else {
            return Err(SchemaError::UnresolvedDiscriminator {
                schema: requested.to_string(),
                value: None,
            });
        };
        let base = config.discriminator_base.clone().unwrap_or_else(|| requested.clone());
        let resolved = self
            .discriminators(&base)
            .get(&value)
            .cloned()
            .ok_or_else(|| SchemaError::UnresolvedDiscriminator {
                schema: requested.to_string(),
                value: Some(value.clone()),
            })?;
        if !self.is_assignable(&resolved, requested) {
            return Err(SchemaError::TypeMismatch {
                requested: requested.to_string(),
                resolved: resolved.to_string(),
            });
        }
        trace!(requested = %requested, resolved = %resolved, discriminator = %value, "resolved discriminated type");
        Ok(resolved)
    }

    // -- Change tracking ------------------------------------------------------

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn on_field_change(&self, handler: impl Fn(&FieldChangeEvent) + Send + Sync + 'static) {
        self.tracker.on_field_change(handler);
    }

    pub fn on_schema_change(&self, handler: impl Fn(&SchemaChangeEvent) + Send + Sync + 'static) {
        self.tracker.on_schema_change(handler);
    }
}

/// Registration calls for one type.
#[derive(Debug, Clone)]
pub struct RegistrationAdapter<'r> {
    registry: &'r SchemaRegistry,
    id: SchemaId,
}

impl RegistrationAdapter<'_> {
    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Merge class-level facts.
    pub fn register(&self, facts: ClassFacts) -> &Self {
        self.registry.with_pending(&self.id, |pending| pending.class.merge(facts));
        self
    }

    /// Merge one field's facts.
    pub fn register_field(&self, name: impl Into<String>, facts: FieldFacts) -> &Self {
        let name = name.into();
        trace!(schema = %self.id, field = %name, "registering field");
        self.registry.with_pending(&self.id, |pending| {
            match pending.fields.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, existing)) => existing.merge(facts),
                None => pending.fields.push((name, facts)),
            }
        });
        self
    }

    /// Merge the facts of a method's positional argument.
    pub fn register_parameter(&self, method: impl Into<String>, index: usize, facts: FieldFacts) -> &Self {
        let method = method.into();
        trace!(schema = %self.id, method = %method, index, "registering parameter");
        self.registry.with_pending(&self.id, |pending| {
            let entry = pending.methods.entry(method).or_default();
            entry.parameters.entry(index).or_default().merge(facts);
        });
        self
    }

    /// Merge method-level facts.
    pub fn register_method(&self, method: impl Into<String>, facts: MethodFacts) -> &Self {
        let method = method.into();
        self.registry.with_pending(&self.id, |pending| {
            pending.methods.entry(method).or_default().facts.merge(facts);
        });
        self
    }
}

/// Declared parent of an installed, pending or expired type.
fn parent_in(state: &RegistryState, id: &SchemaId) -> Option<SchemaId> {
    if let Some(config) = state.installed.get(id) {
        return config.parent.clone();
    }
    if let Some(pending) = state.pending.get(id) {
        return pending.class.parent.clone();
    }
    state.expired.get(id).and_then(|c| c.parent.clone())
}

/// Pending ids ordered so that pending parents precede their children.
fn parents_first(state: &RegistryState) -> Vec<SchemaId> {
    fn visit(id: &SchemaId, state: &RegistryState, seen: &mut HashSet<SchemaId>, out: &mut Vec<SchemaId>) {
        if !seen.insert(id.clone()) {
            return;
        }
        if let Some(parent) = state.pending.get(id).and_then(|p| p.class.parent.as_ref()) {
            if state.pending.contains_key(parent) {
                visit(parent, state, seen, out);
            }
        }
        out.push(id.clone());
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(state.pending_order.len());
    for id in &state.pending_order {
        visit(id, state, &mut seen, &mut out);
    }
    out
}

/// Merge a parent's installed config with a type's own pending facts.
fn assemble(id: &SchemaId, pending: &PendingSchema, parent: Option<&SchemaConfig>) -> SchemaConfig {
    let mut config = SchemaConfig::empty(id.clone());
    let own = &pending.class;

    let mut fields: Vec<(String, SchemaId, FieldFacts)> = Vec::new();
    let mut methods: BTreeMap<String, (MethodFacts, BTreeMap<usize, FieldFacts>)> = BTreeMap::new();
    if let Some(parent) = parent {
        fields.extend(
            parent
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.owner.clone(), FieldFacts::from(f))),
        );
        for (name, method) in &parent.methods {
            let facts = MethodFacts {
                description: method.description.clone(),
            };
            let params = method
                .parameters
                .iter()
                .map(|p| (p.index, FieldFacts::from(&p.field)))
                .collect();
            methods.insert(name.clone(), (facts, params));
        }
        config.view_specs = parent.view_specs.clone();
        config.validators = parent.validators.clone();
        config.discriminated_field = parent.discriminated_field.clone();
        config.discriminator_base = parent.discriminator_base.clone();
    }

    for (name, facts) in &pending.fields {
        match fields.iter_mut().find(|(existing, _, _)| existing == name) {
            Some((_, owner, existing)) => {
                *owner = id.clone();
                existing.merge(facts.clone());
            }
            None => fields.push((name.clone(), id.clone(), facts.clone())),
        }
    }
    for (name, owner, facts) in fields {
        config.fields.push(facts.build(owner, name));
    }

    for (name, method) in &pending.methods {
        let entry = methods.entry(name.clone()).or_default();
        entry.0.merge(method.facts.clone());
        for (index, facts) in &method.parameters {
            entry.1.entry(*index).or_default().merge(facts.clone());
        }
    }
    for (name, (facts, params)) in methods {
        let parameters = params
            .into_iter()
            .map(|(index, facts)| build_parameter(id, index, facts))
            .collect();
        config.methods.insert(
            name.clone(),
            MethodConfig {
                name,
                description: facts.description,
                parameters,
            },
        );
    }

    for (name, spec) in &own.views {
        config.view_specs.retain(|(existing, _)| existing != name);
        config.view_specs.push((name.clone(), spec.clone()));
    }
    config.validators.extend(own.validators.iter().cloned());
    if own.discriminated_field.is_some() {
        config.discriminated_field = own.discriminated_field.clone();
    }
    config.discriminated_type = own.discriminated_type.clone();
    config.is_discriminated_base = own.discriminated_base.unwrap_or(false);
    if config.is_discriminated_base || (config.discriminator_base.is_none() && config.discriminated_field.is_some()) {
        config.discriminator_base = Some(id.clone());
    }
    config.parent = own.parent.clone();
    config.title = own.title.clone();
    config.description = own.description.clone();
    config
}

/// Derive every named view from the full field list.
fn derive_views(config: &mut SchemaConfig) -> Result<(), SchemaError> {
    let mut views = BTreeMap::new();
    for (name, spec) in &config.view_specs {
        let listed = match spec {
            ViewSpec::With(list) | ViewSpec::Without(list) => list,
        };
        if let Some(missing) = listed.iter().find(|f| !config.fields.contains(f)) {
            return Err(SchemaError::UnknownField {
                schema: config.id.to_string(),
                view: name.clone(),
                field: missing.clone(),
            });
        }
        let mut view = ViewConfig::default();
        for field in config.fields.iter() {
            let keep = match spec {
                ViewSpec::With(list) => list.contains(&field.name),
                ViewSpec::Without(list) => !list.contains(&field.name),
            };
            if keep {
                view.push(field.clone());
            }
        }
        views.insert(name.clone(), view);
    }
    config.views = views;
    Ok(())
}

fn build_parameter(owner: &SchemaId, index: usize, facts: FieldFacts) -> ParameterConfig {
    let name = facts.name.clone().unwrap_or_else(|| format!("arg{index}"));
    ParameterConfig {
        index,
        field: facts.build(owner.clone(), name),
    }
}
