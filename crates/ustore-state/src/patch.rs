//! JSON merge patch (RFC 7386) application.

use serde_json::{Map, Value};

/// Apply `patch` to `target` in place.
///
/// Objects merge key by key, `null` removes a key, and any other value
/// (including arrays) replaces the target value wholesale.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                apply_merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
