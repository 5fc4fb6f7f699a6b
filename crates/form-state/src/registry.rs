//! Field registry: one entry per distinct canonical path.
//!
//! Bindings are held weakly. A binding dropped without being unregistered
//! stays in the list as a missing handle, which makes the field skip
//! validation and submission until it is unregistered.

use std::rc::{Rc, Weak};

use form_state_path::NamePath;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::binding::Binding;

pub struct Field {
    pub path: NamePath,
    bindings: Vec<Weak<dyn Binding>>,
    pub touched: bool,
    pub errors: Vec<String>,
    pub initial_value: Option<Value>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path)
            .field("ref_count", &self.ref_count())
            .field("touched", &self.touched)
            .field("errors", &self.errors)
            .field("initial_value", &self.initial_value)
            .finish()
    }
}

fn same_binding(registered: &Weak<dyn Binding>, binding: &Rc<dyn Binding>) -> bool {
    std::ptr::addr_eq(registered.as_ptr(), Rc::as_ptr(binding))
}

impl Field {
    fn new(path: NamePath, binding: &Rc<dyn Binding>, initial_value: Option<Value>) -> Self {
        Field {
            path,
            bindings: vec![Rc::downgrade(binding)],
            touched: false,
            errors: Vec::new(),
            initial_value,
        }
    }

    /// Number of registered bindings; a field exists while this is positive.
    pub fn ref_count(&self) -> usize {
        self.bindings.len()
    }

    /// Every binding, or `None` if any of them has been dropped.
    pub fn live_bindings(&self) -> Option<Vec<Rc<dyn Binding>>> {
        self.bindings.iter().map(Weak::upgrade).collect()
    }

    /// The most recently registered binding, whose transform is used on
    /// submission.
    pub fn authoritative_binding(&self) -> Option<Rc<dyn Binding>> {
        self.bindings.last().and_then(Weak::upgrade)
    }
}

/// Outcome of [`FieldRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    Attached { ref_count: usize },
}

/// Outcome of [`FieldRegistry::unregister`].
#[derive(Debug)]
pub enum Unregistration {
    Detached { ref_count: usize },
    Removed(Field),
    NotRegistered,
    UnknownBinding,
}

/// Public view of a field, paired with its current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub path: NamePath,
    pub touched: bool,
    pub errors: Vec<String>,
    pub value: Option<Value>,
    pub ref_count: usize,
}

/// A failing field as reported by validation and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub path: NamePath,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry::default()
    }

    /// Creates the field or attaches another binding to it. A new initial
    /// value replaces the stored one.
    pub fn register(
        &mut self,
        path: &NamePath,
        binding: &Rc<dyn Binding>,
        initial_value: Option<Value>,
    ) -> Registration {
        let key = path.key();
        match self.fields.get_mut(&key) {
            Some(field) => {
                field.bindings.push(Rc::downgrade(binding));
                if initial_value.is_some() {
                    field.initial_value = initial_value;
                }
                Registration::Attached {
                    ref_count: field.ref_count(),
                }
            }
            None => {
                self.fields
                    .insert(key, Field::new(path.clone(), binding, initial_value));
                Registration::Created
            }
        }
    }

    pub fn unregister(&mut self, path: &NamePath, binding: &Rc<dyn Binding>) -> Unregistration {
        let key = path.key();
        let Some(field) = self.fields.get_mut(&key) else {
            return Unregistration::NotRegistered;
        };
        let Some(pos) = field.bindings.iter().position(|b| same_binding(b, binding)) else {
            return Unregistration::UnknownBinding;
        };
        field.bindings.remove(pos);
        if field.bindings.is_empty() {
            match self.fields.shift_remove(&key) {
                Some(field) => Unregistration::Removed(field),
                None => Unregistration::NotRegistered,
            }
        } else {
            Unregistration::Detached {
                ref_count: field.ref_count(),
            }
        }
    }

    pub fn get(&self, path: &NamePath) -> Option<&Field> {
        self.fields.get(&path.key())
    }

    pub fn get_mut(&mut self, path: &NamePath) -> Option<&mut Field> {
        self.fields.get_mut(&path.key())
    }

    pub fn contains(&self, path: &NamePath) -> bool {
        self.fields.contains_key(&path.key())
    }

    /// Fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn paths(&self) -> Vec<NamePath> {
        self.fields.values().map(|f| f.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `false` when the field does not exist.
    pub fn set_touched(&mut self, path: &NamePath, touched: bool) -> bool {
        match self.get_mut(path) {
            Some(field) => {
                field.touched = touched;
                true
            }
            None => false,
        }
    }

    /// Returns `false` when the field does not exist.
    pub fn set_errors(&mut self, path: &NamePath, errors: Vec<String>) -> bool {
        match self.get_mut(path) {
            Some(field) => {
                field.errors = errors;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use form_state_path::name_path;
    use serde_json::json;

    struct Noop;

    #[async_trait(?Send)]
    impl Binding for Noop {
        async fn validate(&self, _: Option<Value>) -> Option<Vec<String>> {
            None
        }
    }

    fn binding() -> Rc<dyn Binding> {
        Rc::new(Noop)
    }

    #[test]
    fn register_twice_counts_references() {
        let mut registry = FieldRegistry::new();
        let (a, b) = (binding(), binding());
        let path = name_path!["name"];

        assert_eq!(registry.register(&path, &a, None), Registration::Created);
        assert_eq!(
            registry.register(&path, &b, None),
            Registration::Attached { ref_count: 2 }
        );
        assert_eq!(registry.len(), 1);

        assert!(matches!(
            registry.unregister(&path, &a),
            Unregistration::Detached { ref_count: 1 }
        ));
        assert!(matches!(
            registry.unregister(&path, &b),
            Unregistration::Removed(_)
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_unknown() {
        let mut registry = FieldRegistry::new();
        let (a, b) = (binding(), binding());
        let path = name_path!["x"];
        assert!(matches!(
            registry.unregister(&path, &a),
            Unregistration::NotRegistered
        ));
        registry.register(&path, &a, None);
        assert!(matches!(
            registry.unregister(&path, &b),
            Unregistration::UnknownBinding
        ));
        assert_eq!(registry.get(&path).map(Field::ref_count), Some(1));
    }

    #[test]
    fn dropped_binding_is_missing_handle() {
        let mut registry = FieldRegistry::new();
        let keep = binding();
        let path = name_path!["x"];
        registry.register(&path, &keep, None);
        {
            let temporary = binding();
            registry.register(&path, &temporary, None);
        }
        let field = registry.get(&path).unwrap();
        assert_eq!(field.ref_count(), 2);
        assert!(field.live_bindings().is_none());
        assert!(field.authoritative_binding().is_none());
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = FieldRegistry::new();
        let a = binding();
        for name in ["c", "a", "b"] {
            registry.register(&name_path![name], &a, None);
        }
        registry.unregister(&name_path!["a"], &a);
        assert_eq!(registry.paths(), vec![name_path!["c"], name_path!["b"]]);
    }

    #[test]
    fn reattach_replaces_initial_value() {
        let mut registry = FieldRegistry::new();
        let (a, b, c) = (binding(), binding(), binding());
        let path = name_path!["x"];
        registry.register(&path, &a, Some(json!(1)));
        registry.register(&path, &b, None);
        assert_eq!(registry.get(&path).unwrap().initial_value, Some(json!(1)));
        registry.register(&path, &c, Some(json!(2)));
        assert_eq!(registry.get(&path).unwrap().initial_value, Some(json!(2)));
    }

    #[test]
    fn touched_and_errors_on_missing_field() {
        let mut registry = FieldRegistry::new();
        assert!(!registry.set_touched(&name_path!["nope"], true));
        assert!(!registry.set_errors(&name_path!["nope"], vec!["e".into()]));
    }
}
