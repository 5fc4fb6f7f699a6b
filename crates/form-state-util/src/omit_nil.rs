use serde_json::Value;

/// Removes `null` object entries, recursively.
///
/// Array elements are kept in place so indices do not shift; objects nested
/// inside arrays are still cleaned. Absent values never appear in a
/// `serde_json::Value`, so only `null` needs stripping.
///
/// # Examples
///
/// ```
/// use form_state_util::omit_nil;
/// use serde_json::json;
///
/// let mut value = json!({"a": null, "b": {"c": null, "d": 1}, "l": [null, {"e": null}]});
/// omit_nil(&mut value);
/// assert_eq!(value, json!({"b": {"d": 1}, "l": [null, {}]}));
/// ```
pub fn omit_nil(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                omit_nil(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                omit_nil(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_untouched() {
        let mut value = json!(null);
        omit_nil(&mut value);
        assert_eq!(value, json!(null));
    }

    #[test]
    fn test_keeps_falsy_non_null() {
        let mut value = json!({"a": 0, "b": false, "c": "", "d": null});
        omit_nil(&mut value);
        assert_eq!(value, json!({"a": 0, "b": false, "c": ""}));
    }
}
