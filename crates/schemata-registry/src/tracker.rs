//! # Change Tracker
//!
//! Records which schemas embed which other schemas, and notifies listeners
//! when a redefined schema's fields change.
//!
//! ## Events
//!
//! Re-finalizing an installed (or removed) schema produces:
//!
//! - one [`FieldChangeEvent`] for the schema itself, listing its field diff;
//! - one [`SchemaChangeEvent`] per transitively dependent schema, carrying
//!   the field path through which the dependent reaches the changed schema.
//!
//! Handlers run on the thread that called `finalize`, after every registry
//! lock has been released.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use schemata_core::SchemaId;
use tracing::{debug, trace};

use crate::field::FieldConfig;
use crate::schema::SchemaConfig;

/// One field-level difference between two versions of a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Added(FieldConfig),
    Removing(FieldConfig),
    Changed { before: FieldConfig, after: FieldConfig },
}

impl FieldChange {
    pub fn name(&self) -> &str {
        match self {
            Self::Added(field) | Self::Removing(field) => &field.name,
            Self::Changed { after, .. } => &after.name,
        }
    }
}

/// Fields of `schema` changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChangeEvent {
    pub schema: SchemaId,
    pub changes: Vec<FieldChange>,
}

/// A schema embedded (directly or transitively) by `schema` changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaChangeEvent {
    pub schema: SchemaId,
    pub changes: Vec<SubSchemaChange>,
}

/// The embedded schema `changed`, reached from the dependent through `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSchemaChange {
    pub path: String,
    pub changed: SchemaId,
    pub fields: Vec<FieldChange>,
}

/// A schema embedding another through the field at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependent {
    pub schema: SchemaId,
    pub path: String,
}

pub type FieldChangeHandler = Arc<dyn Fn(&FieldChangeEvent) + Send + Sync>;
pub type SchemaChangeHandler = Arc<dyn Fn(&SchemaChangeEvent) + Send + Sync>;

/// Dependency graph plus change listeners.
#[derive(Default)]
pub struct ChangeTracker {
    dependents: RwLock<HashMap<SchemaId, Vec<Dependent>>>,
    field_handlers: RwLock<Vec<FieldChangeHandler>>,
    schema_handlers: RwLock<Vec<SchemaChangeHandler>>,
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("dependents", &*self.dependents.read())
            .field("field_handlers", &self.field_handlers.read().len())
            .field("schema_handlers", &self.schema_handlers.read().len())
            .finish()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_field_change(&self, handler: impl Fn(&FieldChangeEvent) + Send + Sync + 'static) {
        self.field_handlers.write().push(Arc::new(handler));
    }

    pub fn on_schema_change(&self, handler: impl Fn(&SchemaChangeEvent) + Send + Sync + 'static) {
        self.schema_handlers.write().push(Arc::new(handler));
    }

    /// Record the nested schemas `config` embeds, replacing what was
    /// recorded for an earlier version of it.
    pub fn track(&self, config: &SchemaConfig) {
        let mut graph = self.dependents.write();
        remove_dependent(&mut graph, &config.id);
        for field in config.fields.iter() {
            let Some(nested) = field.schema() else { continue };
            let dependent = Dependent {
                schema: config.id.clone(),
                path: field.name.clone(),
            };
            trace!(schema = %config.id, nested = %nested, path = %field.name, "tracking dependency");
            let list = graph.entry(nested.clone()).or_default();
            if !list.contains(&dependent) {
                list.push(dependent);
            }
        }
    }

    /// Drop every dependency recorded for `id` as an embedding schema.
    pub fn forget(&self, id: &SchemaId) {
        remove_dependent(&mut self.dependents.write(), id);
    }

    /// Schemas that directly embed `id`.
    pub fn dependents_of(&self, id: &SchemaId) -> Vec<Dependent> {
        self.dependents.read().get(id).cloned().unwrap_or_default()
    }

    /// Field-level diff between two versions of a schema, in the new
    /// version's field order followed by removed fields.
    pub fn diff(before: &SchemaConfig, after: &SchemaConfig) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        for field in after.fields.iter() {
            match before.fields.get(&field.name) {
                None => changes.push(FieldChange::Added(field.clone())),
                Some(old) if old != field => changes.push(FieldChange::Changed {
                    before: old.clone(),
                    after: field.clone(),
                }),
                Some(_) => {}
            }
        }
        for field in before.fields.iter() {
            if !after.fields.contains(&field.name) {
                changes.push(FieldChange::Removing(field.clone()));
            }
        }
        changes
    }

    /// Notify listeners that `before` was replaced by `after`.
    pub(crate) fn notify(&self, before: &SchemaConfig, after: &SchemaConfig) {
        let changes = Self::diff(before, after);
        if changes.is_empty() {
            trace!(schema = %after.id, "redefinition changed no fields");
            return;
        }
        debug!(schema = %after.id, changes = changes.len(), "schema fields changed");

        let field_event = FieldChangeEvent {
            schema: after.id.clone(),
            changes: changes.clone(),
        };
        let field_handlers = self.field_handlers.read().clone();
        for handler in &field_handlers {
            handler(&field_event);
        }

        let schema_events = self.propagate(&after.id, &changes);
        let schema_handlers = self.schema_handlers.read().clone();
        for event in &schema_events {
            for handler in &schema_handlers {
                handler(event);
            }
        }
    }

    /// Breadth-first walk over dependents; each schema is expanded once.
    fn propagate(&self, changed: &SchemaId, changes: &[FieldChange]) -> Vec<SchemaChangeEvent> {
        let mut events: Vec<SchemaChangeEvent> = Vec::new();
        let mut visited = HashSet::from([changed.clone()]);
        let mut queue = VecDeque::from([(changed.clone(), String::new())]);

        while let Some((current, suffix)) = queue.pop_front() {
            for dependent in self.dependents_of(&current) {
                if dependent.schema == *changed {
                    continue;
                }
                let path = if suffix.is_empty() {
                    dependent.path.clone()
                } else {
                    format!("{}.{}", dependent.path, suffix)
                };
                let change = SubSchemaChange {
                    path: path.clone(),
                    changed: changed.clone(),
                    fields: changes.to_vec(),
                };
                match events.iter_mut().find(|e| e.schema == dependent.schema) {
                    Some(event) => event.changes.push(change),
                    None => events.push(SchemaChangeEvent {
                        schema: dependent.schema.clone(),
                        changes: vec![change],
                    }),
                }
                if visited.insert(dependent.schema.clone()) {
                    queue.push_back((dependent.schema, path));
                }
            }
        }
        events
    }
}

fn remove_dependent(graph: &mut HashMap<SchemaId, Vec<Dependent>>, id: &SchemaId) {
    for list in graph.values_mut() {
        list.retain(|d| d.schema != *id);
    }
    graph.retain(|_, list| !list.is_empty());
}
