//! Field-by-field merging of configuration tiers.
//!
//! Higher tiers override lower ones key by key. Arrays are replaced, not
//! concatenated.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Objects merge recursively; any other overlay value replaces the base,
/// except `null`, which leaves the base untouched.
///
/// ```
/// use serde_json::json;
/// use task_deps_mcp::config::deep_merge;
///
/// let defaults = json!({"analysis": {"max_depth": 10, "max_suggestions": 10}});
/// let project = json!({"analysis": {"max_depth": 4}});
/// assert_eq!(
///     deep_merge(defaults, project),
///     json!({"analysis": {"max_depth": 4, "max_suggestions": 10}})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold `deep_merge` over tiers, lowest priority first.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
