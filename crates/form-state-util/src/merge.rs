//! Recursive merge of JSON values.

use serde_json::Value;

/// Deep-merges `source` into `target`.
///
/// Objects are merged key by key and arrays index by index, recursing when
/// both sides hold a container of the same kind. Any other source value
/// overwrites the target slot.
///
/// # Examples
///
/// ```
/// use form_state_util::deep_merge;
/// use serde_json::json;
///
/// let mut target = json!({"a": {"x": 1}, "list": [1, 2]});
/// deep_merge(&mut target, json!({"a": {"y": 2}, "list": [9]}));
/// assert_eq!(target, json!({"a": {"x": 1, "y": 2}, "list": [9, 2]}));
/// ```
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            for (idx, value) in src.into_iter().enumerate() {
                match dst.get_mut(idx) {
                    Some(slot) => deep_merge(slot, value),
                    None => dst.push(value),
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_into_empty() {
        let mut target = json!({});
        deep_merge(&mut target, json!({"a": [1, {"b": 2}]}));
        assert_eq!(target, json!({"a": [1, {"b": 2}]}));
    }

    #[test]
    fn test_scalar_overwrites_container() {
        let mut target = json!({"a": {"b": 1}});
        deep_merge(&mut target, json!({"a": 5}));
        assert_eq!(target, json!({"a": 5}));
    }

    #[test]
    fn test_container_overwrites_scalar() {
        let mut target = json!({"a": 5});
        deep_merge(&mut target, json!({"a": {"b": 1}}));
        assert_eq!(target, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_null_overwrites() {
        let mut target = json!({"a": 1});
        deep_merge(&mut target, json!({"a": null}));
        assert_eq!(target, json!({"a": null}));
    }
}
