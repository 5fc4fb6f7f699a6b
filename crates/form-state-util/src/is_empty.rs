use serde_json::Value;

/// Check if a form value is empty.
///
/// A value is empty when it is absent, `null`, the empty string, an empty
/// array, or an object with no entries. `0` and `false` are not empty.
///
/// # Examples
///
/// ```
/// use form_state_util::is_empty;
/// use serde_json::json;
///
/// assert!(is_empty(None));
/// assert!(is_empty(Some(&json!(""))));
/// assert!(!is_empty(Some(&json!(0))));
/// ```
pub fn is_empty(value: Option<&Value>) -> bool {
    value.map_or(true, is_empty_value)
}

/// [`is_empty`] for a value known to be present.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_values() {
        assert!(is_empty(None));
        assert!(is_empty(Some(&json!(null))));
        assert!(is_empty(Some(&json!(""))));
        assert!(is_empty(Some(&json!([]))));
        assert!(is_empty(Some(&json!({}))));
    }

    #[test]
    fn test_non_empty_values() {
        assert!(!is_empty(Some(&json!(" "))));
        assert!(!is_empty(Some(&json!(0))));
        assert!(!is_empty(Some(&json!(false))));
        assert!(!is_empty(Some(&json!([null]))));
        assert!(!is_empty(Some(&json!({"a": null}))));
    }
}
