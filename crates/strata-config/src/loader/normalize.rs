//! Reconciliation of deep-searched subtrees against read-time overrides.
//!
//! Environment overrides for sequence elements cannot be discovered by deep
//! search alone: the element's key path contains a numeric index segment that
//! no merge step ever enumerates. This walk composes the exact path of every
//! leaf under a group's subtree and probes the settings tree for an override
//! there, which also applies environment overrides to ordinary scalar leaves.

use super::tree::SettingsTree;
use serde_json::Value;

/// Probe every leaf of `subtree` for an override at its composed key path.
///
/// Returns a corrected copy and whether any substitution occurred. Only
/// existing elements are visited: an override aimed at a sequence index that
/// no default or profile populated is not discovered.
pub(crate) fn reconcile(tree: &SettingsTree, prefix: &str, subtree: &Value) -> (Value, bool) {
    match subtree {
        Value::Array(items) => {
            let mut changed = false;
            let corrected = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let (value, item_changed) =
                        reconcile(tree, &format!("{prefix}.{index}"), item);
                    changed |= item_changed;
                    value
                })
                .collect();
            (Value::Array(corrected), changed)
        }
        Value::Object(map) => {
            let mut changed = false;
            let corrected = map
                .iter()
                .map(|(key, value)| {
                    let (value, entry_changed) = reconcile(tree, &format!("{prefix}.{key}"), value);
                    changed |= entry_changed;
                    (key.clone(), value)
                })
                .collect();
            (Value::Object(corrected), changed)
        }
        leaf => match tree.get(prefix) {
            Some(probed) if probed != *leaf => (probed, true),
            _ => (leaf.clone(), false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_env::with_env;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree_of(doc: Value) -> SettingsTree {
        let mut tree = SettingsTree::new();
        tree.merge(doc);
        tree
    }

    #[test]
    fn untouched_subtree_reports_no_change() {
        let tree = tree_of(json!({"db": {"servers": ["a", "b", "c"]}}));
        let subtree = tree.deep_search("db");
        let (corrected, changed) = reconcile(&tree, "db", &subtree);
        assert!(!changed);
        assert_eq!(corrected, subtree);
    }

    #[test]
    fn environment_overrides_a_sequence_element() {
        let tree = tree_of(json!({"db": {"servers": ["a", "b", "c"]}}));
        let subtree = tree.deep_search("db");
        with_env(&[("DB_SERVERS_1", "z")], || {
            let (corrected, changed) = reconcile(&tree, "db", &subtree);
            assert!(changed);
            assert_eq!(corrected, json!({"servers": ["a", "z", "c"]}));
        });
    }

    #[test]
    fn nested_sequences_of_maps_are_walked() {
        let tree = tree_of(json!({
            "pool": {"shards": [{"replicas": ["a", "b"]}, {"replicas": ["c"]}]}
        }));
        let subtree = tree.deep_search("pool");
        with_env(&[("POOL_SHARDS_0_REPLICAS_1", "z")], || {
            let (corrected, changed) = reconcile(&tree, "pool", &subtree);
            assert!(changed);
            assert_eq!(
                corrected,
                json!({"shards": [{"replicas": ["a", "z"]}, {"replicas": ["c"]}]})
            );
        });
    }

    #[test]
    fn absent_index_is_not_extended() {
        let tree = tree_of(json!({"db": {"servers": ["a", "b", "c"]}}));
        let subtree = tree.deep_search("db");
        with_env(&[("DB_SERVERS_3", "x")], || {
            let (corrected, changed) = reconcile(&tree, "db", &subtree);
            assert!(!changed);
            assert_eq!(corrected, json!({"servers": ["a", "b", "c"]}));
        });
    }
}
