// Deep merge for replicated state
//
// Union of keys, recurse where both sides hold an object, incoming wins on
// everything else (scalars, arrays, null). Not a CRDT: applying the same
// two updates in different orders can give different results.

use serde_json::Value;

/// Result of merging a remote state into the local one
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Games that did not exist locally
    pub new_games: usize,
    /// Existing games whose content changed
    pub updated_games: usize,
    /// Total games after merge
    pub total_after_merge: usize,
}

impl MergeResult {
    /// Whether the merge changed anything
    pub fn changed(&self) -> bool {
        self.new_games > 0 || self.updated_games > 0
    }
}

/// Merge `incoming` into `target` in place
pub fn deep_merge(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(local), Value::Object(remote)) => {
            for (key, remote_value) in remote {
                let recurse =
                    remote_value.is_object() && local.get(key).is_some_and(Value::is_object);

                match local.get_mut(key) {
                    Some(local_value) if recurse => deep_merge(local_value, remote_value),
                    _ => {
                        local.insert(key.clone(), remote_value.clone());
                    }
                }
            }
        }
        (target, incoming) => *target = incoming.clone(),
    }
}
