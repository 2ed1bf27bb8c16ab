//! Metadata merging

use serde_json::Value;

/// Recursively merge `overlay` into `base`.
///
/// Objects merge key by key; every other value (arrays included) in
/// `overlay` replaces the one in `base`.
pub fn deep_merge(base: Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                base.insert(key.clone(), merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay.clone(),
    }
}
