//! Navigation of a `serde_json::Value` tree by [`NamePath`].

use serde_json::{Map, Value};

use crate::codec::PathError;
use crate::types::{NamePath, PathSegment};

/// Largest array index a write may address. Writing pads the array with
/// `null` up to the index.
pub const MAX_INDEX: usize = 1 << 20;

/// Get a value by path.
///
/// Returns `None` if any step is missing. An index segment on an object
/// reads the index as a string key; a key segment on an array reads nothing.
///
/// # Example
///
/// ```
/// use form_state_path::{get, name_path};
/// use serde_json::json;
///
/// let doc = json!({"users": [{"name": "ada"}]});
/// assert_eq!(get(&doc, &name_path!["users", 0usize, "name"]), Some(&json!("ada")));
/// assert_eq!(get(&doc, &name_path!["users", 1usize]), None);
/// ```
pub fn get<'a>(val: &'a Value, path: &NamePath) -> Option<&'a Value> {
    let mut current = val;
    for step in path {
        current = match (current, step) {
            (Value::Array(arr), PathSegment::Index(idx)) => arr.get(*idx)?,
            (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
            (Value::Object(map), PathSegment::Index(idx)) => map.get(&idx.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_mut<'a>(val: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = val;
    for step in path {
        current = match (current, step) {
            (Value::Array(arr), PathSegment::Index(idx)) => arr.get_mut(*idx)?,
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key)?,
            (Value::Object(map), PathSegment::Index(idx)) => map.get_mut(&idx.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

fn container_for(step: &PathSegment) -> Value {
    match step {
        PathSegment::Key(_) => Value::Object(Map::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    }
}

fn check_index(idx: usize) -> Result<(), PathError> {
    if idx > MAX_INDEX {
        return Err(PathError::IndexTooLarge(idx));
    }
    Ok(())
}

/// Returns the child slot for `step`, creating it when missing.
///
/// Only `null` or a scalar is replaced by a new container. An index on an
/// existing object addresses the index as a string key.
fn child_slot<'a>(slot: &'a mut Value, step: &PathSegment) -> Result<&'a mut Value, PathError> {
    if !matches!(slot, Value::Object(_) | Value::Array(_)) {
        *slot = container_for(step);
    }
    match (slot, step) {
        (Value::Object(map), PathSegment::Key(key)) => {
            Ok(map.entry(key.clone()).or_insert(Value::Null))
        }
        (Value::Object(map), PathSegment::Index(idx)) => {
            Ok(map.entry(idx.to_string()).or_insert(Value::Null))
        }
        (Value::Array(arr), PathSegment::Index(idx)) => {
            check_index(*idx)?;
            if arr.len() <= *idx {
                arr.resize(*idx + 1, Value::Null);
            }
            Ok(&mut arr[*idx])
        }
        (_, PathSegment::Key(key)) => Err(PathError::KeyOnArray { key: key.clone() }),
        (_, PathSegment::Index(idx)) => Err(PathError::InvalidIndex(idx.to_string())),
    }
}

/// Writes `value` into `slot` at the final step and returns what was there.
fn put(slot: &mut Value, step: &PathSegment, value: Value) -> Result<Option<Value>, PathError> {
    if !matches!(slot, Value::Object(_) | Value::Array(_)) {
        *slot = container_for(step);
    }
    match (slot, step) {
        (Value::Object(map), PathSegment::Key(key)) => Ok(map.insert(key.clone(), value)),
        (Value::Object(map), PathSegment::Index(idx)) => Ok(map.insert(idx.to_string(), value)),
        (Value::Array(arr), PathSegment::Index(idx)) => {
            check_index(*idx)?;
            if *idx < arr.len() {
                Ok(Some(std::mem::replace(&mut arr[*idx], value)))
            } else {
                arr.resize(*idx, Value::Null);
                arr.push(value);
                Ok(None)
            }
        }
        (_, PathSegment::Key(key)) => Err(PathError::KeyOnArray { key: key.clone() }),
        (_, PathSegment::Index(idx)) => Err(PathError::InvalidIndex(idx.to_string())),
    }
}

/// Writes `value` at `path`, creating intermediate containers on demand.
///
/// Missing steps and `null` or scalar values in the way become objects for
/// key segments and arrays (padded with `null`) for index segments. Existing
/// containers are never replaced: an index on an object is written as a
/// string key. Returns the previous value at `path`, `None` when the slot did
/// not exist.
///
/// # Errors
///
/// [`PathError::KeyOnArray`] when a key segment meets an existing array and
/// [`PathError::IndexTooLarge`] for an index beyond [`MAX_INDEX`]. The tree
/// is left without the write; containers created on the way may remain.
///
/// # Example
///
/// ```
/// use form_state_path::{set, name_path};
/// use serde_json::json;
///
/// let mut doc = json!({});
/// set(&mut doc, &name_path!["list", 1usize, "a"], json!(true)).unwrap();
/// assert_eq!(doc, json!({"list": [null, {"a": true}]}));
/// ```
pub fn set(root: &mut Value, path: &NamePath, value: Value) -> Result<Option<Value>, PathError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };
    let mut current = root;
    for step in parents {
        current = child_slot(current, step)?;
    }
    put(current, last, value)
}

/// Removes the value at `path`, returning it.
///
/// Object entries are removed. A trailing array element is popped; any other
/// array element is replaced with `null` so sibling indices stay stable.
pub fn unset(root: &mut Value, path: &NamePath) -> Option<Value> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Some(std::mem::replace(root, Value::Null));
    };
    match (get_mut(root, parents)?, last) {
        (Value::Object(map), PathSegment::Key(key)) => map.remove(key),
        (Value::Object(map), PathSegment::Index(idx)) => map.remove(&idx.to_string()),
        (Value::Array(arr), PathSegment::Index(idx)) => {
            if arr.len().checked_sub(1) == Some(*idx) {
                arr.pop()
            } else if *idx < arr.len() {
                Some(std::mem::replace(&mut arr[*idx], Value::Null))
            } else {
                None
            }
        }
        _ => None,
    }
}
