//! # Path Utilities
//!
//! HTTP query strings and CLI flags arrive as flat maps whose keys encode
//! structure: `a.b[3].c`, `tags[]`, `meta[region]`. [`expand_paths`] turns
//! such a map into a nested tree; [`flatten_paths`] is the inverse.
//!
//! ## Key Grammar
//!
//! A key is a `.`-separated list of parts. Each part is an optional name
//! followed by any number of bracket selectors:
//!
//! - `[3]` — array index,
//! - `[]` — append to an array,
//! - `[name]` — object key.
//!
//! Object keys in a tree passed to [`flatten_paths`] must not contain `.`,
//! `[` or `]` for the two functions to round-trip.

use tracing::trace;

use crate::merge::{deep_assign, MergeMode};
use crate::value::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Append,
}

impl Segment {
    fn wants_array(&self) -> bool {
        matches!(self, Self::Index(_) | Self::Append)
    }
}

fn parse_key(key: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in key.split('.') {
        let (name, mut selectors) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part, ""),
        };
        if !name.is_empty() || selectors.is_empty() {
            segments.push(Segment::Key(name.to_string()));
        }
        while let Some(rest) = selectors.strip_prefix('[') {
            let Some(close) = rest.find(']') else {
                // unterminated selector: keep the remainder as a literal key
                segments.push(Segment::Key(rest.to_string()));
                break;
            };
            let inner = rest[..close].trim();
            segments.push(if inner.is_empty() {
                Segment::Append
            } else if let Ok(index) = inner.parse::<usize>() {
                Segment::Index(index)
            } else {
                Segment::Key(inner.to_string())
            });
            selectors = &rest[close + 1..];
        }
    }
    segments
}

/// Expand a flat map with dotted/bracketed keys into a nested tree.
///
/// Values that are themselves objects are expanded recursively and merged
/// into any value already present at their path instead of replacing it.
pub fn expand_paths(flat: Map) -> Map {
    let mut root = Value::Map(Map::new());
    for (key, value) in flat {
        let value = match value {
            Value::Map(nested) => Value::Map(expand_paths(nested)),
            other => other,
        };
        let segments = parse_key(&key);
        trace!(key = %key, depth = segments.len(), "expanding path");
        insert(&mut root, &segments, value);
    }
    match root {
        Value::Map(map) => map,
        _ => Map::new(),
    }
}

fn insert(container: &mut Value, segments: &[Segment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let slot = match slot_for(container, head) {
        Some(slot) => slot,
        None => return,
    };
    match rest.first() {
        None => place(slot, value),
        Some(next) => {
            let compatible = match slot {
                Value::Array(_) => next.wants_array(),
                Value::Map(_) => true,
                _ => false,
            };
            if !compatible {
                *slot = if next.wants_array() {
                    Value::Array(Vec::new())
                } else {
                    Value::Map(Map::new())
                };
            }
            insert(slot, rest, value);
        }
    }
}

/// Locate (creating as needed) the slot `segment` addresses in `container`.
fn slot_for<'a>(container: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (container, segment) {
        (Value::Array(items), Segment::Index(index)) => {
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(*index)
        }
        (Value::Array(items), Segment::Append) => {
            items.push(Value::Null);
            items.last_mut()
        }
        (Value::Map(map), segment) => Some(map.entry(segment_key(segment, map.len())).or_insert(Value::Null)),
        _ => None,
    }
}

fn segment_key(segment: &Segment, len: usize) -> String {
    match segment {
        Segment::Key(key) => key.clone(),
        Segment::Index(index) => index.to_string(),
        Segment::Append => len.to_string(),
    }
}

fn place(slot: &mut Value, value: Value) {
    if matches!((&*slot, &value), (Value::Map(_), Value::Map(_))) {
        let existing = std::mem::replace(slot, Value::Null);
        *slot = match deep_assign(existing, value.clone(), MergeMode::Coerce) {
            Ok(merged) => merged,
            Err(_) => value,
        };
    } else {
        *slot = value;
    }
}

/// Flatten a nested tree into dotted/bracketed keys.
///
/// Empty objects and arrays are kept as leaf values so that
/// [`expand_paths`] reconstructs them.
pub fn flatten_paths(tree: &Map) -> Map {
    let mut out = Map::new();
    for (key, value) in tree {
        flatten_into(&mut out, key.clone(), value);
    }
    out
}

fn flatten_into(out: &mut Map, prefix: String, value: &Value) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(out, format!("{prefix}.{key}"), child);
            }
        }
        Value::Instance(instance) if !instance.fields().is_empty() => {
            for (key, child) in instance.fields() {
                flatten_into(out, format!("{prefix}.{key}"), child);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(out, format!("{prefix}[{index}]"), child);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Acyclic trees with keys free of path syntax.
    fn tree() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-zA-Z0-9 _-]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z][a-z0-9_]{0,7}", inner, 0..6).prop_map(Value::Map),
            ]
        })
    }

    proptest! {
        /// expand(flatten(tree)) reconstructs the tree.
        #[test]
        fn flatten_then_expand_round_trips(
            root in prop::collection::btree_map("[a-z][a-z0-9_]{0,7}", tree(), 0..6)
        ) {
            let flat = flatten_paths(&root);
            prop_assert_eq!(expand_paths(flat), root);
        }
    }
}
