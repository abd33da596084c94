//! JSON merge helpers for the settings tree.

use serde_json::map::Entry;
use serde_json::{Map, Value};

/// Merge an overlay document into the base, consuming the overlay.
///
/// Scalars and sequences replace wholesale; only objects merge key-by-key,
/// with overlay entries moved into the base rather than cloned.
pub(crate) fn merge_values(base: &mut Value, overlay: Value) {
    let overlay_map = match overlay {
        Value::Object(map) => map,
        scalar_or_sequence => {
            *base = scalar_or_sequence;
            return;
        }
    };
    match base {
        Value::Object(base_map) => {
            for (key, value) in overlay_map {
                match base_map.entry(key) {
                    Entry::Occupied(mut entry) => merge_values(entry.get_mut(), value),
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                    }
                }
            }
        }
        non_map => *non_map = Value::Object(overlay_map),
    }
}

/// Wrap a leaf value in nested objects along the dotted prefix.
///
/// `nested_document("a.b", v)` produces `{"a": {"b": v}}`.
pub(crate) fn nested_document(prefix: &str, leaf: Value) -> Value {
    prefix.rsplit('.').fold(leaf, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn objects_merge_key_by_key() {
        let mut base = json!({"db": {"host": "localhost", "port": 5432}});
        merge_values(&mut base, json!({"db": {"host": "remote"}}));
        assert_eq!(base, json!({"db": {"host": "remote", "port": 5432}}));
    }

    #[test]
    fn sequences_replace_wholesale() {
        let mut base = json!({"servers": ["a", "b", "c"]});
        merge_values(&mut base, json!({"servers": ["z"]}));
        assert_eq!(base, json!({"servers": ["z"]}));
    }

    #[test]
    fn scalar_overrides_object() {
        let mut base = json!({"db": {"host": "localhost"}});
        merge_values(&mut base, json!({"db": "disabled"}));
        assert_eq!(base, json!({"db": "disabled"}));
    }

    #[test]
    fn object_overrides_scalar() {
        let mut base = json!({"db": "disabled"});
        merge_values(&mut base, json!({"db": {"host": "remote"}}));
        assert_eq!(base, json!({"db": {"host": "remote"}}));
    }

    #[test]
    fn deeply_nested_maps_merge() {
        let mut base = json!({"a": {"b": {"c": 1, "keep": true}}});
        merge_values(&mut base, json!({"a": {"b": {"c": 2}, "d": 3}}));
        assert_eq!(base, json!({"a": {"b": {"c": 2, "keep": true}, "d": 3}}));
    }

    #[test]
    fn nested_document_builds_prefix_path() {
        let doc = nested_document("app.datasource", json!({"url": "x"}));
        assert_eq!(doc, json!({"app": {"datasource": {"url": "x"}}}));
    }
}
