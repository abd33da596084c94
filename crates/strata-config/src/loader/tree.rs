//! The unified settings tree and its read-time override semantics.

use super::merge;
use serde_json::{Map, Value};
use std::env;

/// Nested document produced by merging every configuration source.
///
/// Owned exclusively by the loader for the duration of one load. Sources are
/// merged in increasing priority: group defaults, then profiles in listed
/// order. Environment variables act as an implicit highest-priority layer
/// applied lazily by [`SettingsTree::get`] rather than merged eagerly, so
/// they can override keys the loader cannot enumerate up front (sequence
/// indices in particular).
#[derive(Debug, Default)]
pub(crate) struct SettingsTree {
    root: Value,
}

impl SettingsTree {
    pub(crate) fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Deep-merge a document into the tree; later merges win.
    pub(crate) fn merge(&mut self, document: Value) {
        merge::merge_values(&mut self.root, document);
    }

    /// Resolve a dotted key path, environment first.
    ///
    /// Returns the value of the environment variable named by the uppercased,
    /// underscore-joined path when set, else the merged value at the path,
    /// else `None`.
    pub(crate) fn get(&self, key_path: &str) -> Option<Value> {
        if let Ok(raw) = env::var(env_key(key_path)) {
            return Some(Value::String(raw));
        }
        self.lookup(key_path).cloned()
    }

    /// Walk the merged tree only, without the environment layer. Numeric
    /// segments index into sequences.
    fn lookup(&self, key_path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in key_path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Extract the nested map at a dotted prefix.
    ///
    /// Absent is empty, not an error: if any segment is missing or the value
    /// there is not a map, an empty object is returned so the owning group
    /// still binds against its compiled-in defaults.
    pub(crate) fn deep_search(&self, prefix: &str) -> Value {
        let mut current = &self.root;
        for segment in prefix.split('.') {
            match current {
                Value::Object(map) => match map.get(segment) {
                    Some(value) => current = value,
                    None => return Value::Object(Map::new()),
                },
                _ => return Value::Object(Map::new()),
            }
        }
        match current {
            Value::Object(_) => current.clone(),
            _ => Value::Object(Map::new()),
        }
    }
}

/// Environment variable name for a dotted key path: `a.b.c` -> `A_B_C`.
pub(crate) fn env_key(key_path: &str) -> String {
    key_path.replace('.', "_").to_ascii_uppercase()
}
