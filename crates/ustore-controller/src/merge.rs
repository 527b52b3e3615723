//! Structural override merge and merge-patch diffing over JSON values.
//!
//! Convergence never writes a whole object back. It overlays the desired
//! shape on what the store returned, then sends only the difference between
//! the observed and the merged value as an RFC 7386 merge patch. Fields the
//! platform owns (uid, resource version, cluster IP) stay untouched because
//! the desired shape never carries them.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Overlay `desired` on `observed`.
///
/// Objects merge key by key. A desired value that is empty (`null`, `""`,
/// `[]`, `{}`) keeps the observed value. Any other desired value replaces the
/// observed one; sequences are replaced as a whole, never appended.
pub fn merge_override(observed: &Value, desired: &Value) -> Value {
    match (observed, desired) {
        (Value::Object(observed_map), Value::Object(desired_map)) => {
            let mut merged = observed_map.clone();
            for (key, value) in desired_map {
                if is_empty(value) {
                    continue;
                }
                let next = match observed_map.get(key) {
                    Some(current) => merge_override(current, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, value) if is_empty(value) => observed.clone(),
        (_, value) => value.clone(),
    }
}

/// Merge patch turning `before` into `after`, `None` when they are equal.
pub fn diff(before: &Value, after: &Value) -> Option<Value> {
    if before == after {
        return None;
    }
    let (Value::Object(before_map), Value::Object(after_map)) = (before, after) else {
        return Some(after.clone());
    };

    let mut patch = Map::new();
    for key in before_map.keys() {
        if !after_map.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    for (key, value) in after_map {
        match before_map.get(key) {
            Some(current) => {
                if let Some(change) = diff(current, value) {
                    patch.insert(key.clone(), change);
                }
            }
            None => {
                patch.insert(key.clone(), value.clone());
            }
        }
    }

    (!patch.is_empty()).then_some(Value::Object(patch))
}

/// Result of overlaying a desired object on an observed one.
#[derive(Debug, Clone)]
pub struct Merged<T> {
    /// The observed object with the desired fields applied.
    pub object: T,
    /// Merge patch from the observed object to `object`.
    pub patch: Option<Value>,
}

/// Typed form of [`merge_override`] followed by [`diff`].
pub fn merge_typed<T>(observed: &T, desired: &T) -> Result<Merged<T>, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let before = serde_json::to_value(observed)?;
    let after = merge_override(&before, &serde_json::to_value(desired)?);
    let patch = diff(&before, &after);
    Ok(Merged {
        object: serde_json::from_value(after)?,
        patch,
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
