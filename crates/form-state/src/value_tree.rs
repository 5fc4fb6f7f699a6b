//! The authoritative nested value store.
//!
//! The root is reference counted: writes go through `Rc::make_mut`, so a
//! snapshot handed out to observers is never mutated afterwards and a write
//! only clones the tree when a snapshot is still alive.

use std::rc::Rc;

use form_state_path::{self as nav, NamePath, PathError};
use serde_json::{Map, Value};
use tracing::warn;

/// One entry of a batched write.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: NamePath,
    /// `None` unsets the location.
    pub value: Option<Value>,
    /// `Some` updates the field's touched flag, `None` leaves it as is.
    pub touched: Option<bool>,
}

impl FieldUpdate {
    pub fn new(path: NamePath, value: impl Into<Option<Value>>) -> Self {
        FieldUpdate {
            path,
            value: value.into(),
            touched: None,
        }
    }

    pub fn unset(path: NamePath) -> Self {
        FieldUpdate {
            path,
            value: None,
            touched: None,
        }
    }

    pub fn touched(mut self, touched: bool) -> Self {
        self.touched = Some(touched);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValueTree {
    root: Rc<Value>,
}

impl Default for ValueTree {
    fn default() -> Self {
        ValueTree::new()
    }
}

impl ValueTree {
    pub fn new() -> Self {
        ValueTree {
            root: Rc::new(Value::Object(Map::new())),
        }
    }

    pub fn get(&self, path: &NamePath) -> Option<&Value> {
        nav::get(&self.root, path)
    }

    /// Writes `value` at `path`; `None` unsets it. Returns the previous
    /// value.
    ///
    /// # Errors
    ///
    /// Fails when `path` cannot be addressed in the current tree, such as a
    /// key segment meeting an array. Nothing is written then.
    pub fn set(&mut self, path: &NamePath, value: Option<Value>) -> Result<Option<Value>, PathError> {
        let root = Rc::make_mut(&mut self.root);
        match value {
            Some(value) => nav::set(root, path, value),
            None if path.is_empty() => Ok(Some(std::mem::replace(root, Value::Object(Map::new())))),
            None => Ok(nav::unset(root, path)),
        }
    }

    /// Applies every update onto one derived tree and returns the ones that
    /// were written. Unaddressable updates are skipped with a warning.
    pub fn apply<'a>(&mut self, updates: &'a [FieldUpdate]) -> Vec<&'a FieldUpdate> {
        updates
            .iter()
            .filter(|update| match self.set(&update.path, update.value.clone()) {
                Ok(_) => true,
                Err(err) => {
                    warn!(field = %update.path, error = %err, "value not written");
                    false
                }
            })
            .collect()
    }

    /// Cheap handle to the current root.
    pub fn snapshot(&self) -> Rc<Value> {
        Rc::clone(&self.root)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Builds a tree holding only the requested paths, in the same nesting
    /// shape. Absent paths stay absent.
    pub fn pick(&self, paths: &[NamePath]) -> Value {
        let mut out = Value::Object(Map::new());
        for p in paths {
            if let Some(value) = self.get(p) {
                if let Err(err) = nav::set(&mut out, p, value.clone()) {
                    warn!(field = %p, error = %err, "path skipped while picking");
                }
            }
        }
        out
    }
}
