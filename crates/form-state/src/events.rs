//! Notifications delivered to form subscribers.

use std::rc::Rc;

use form_state_path::NamePath;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub path: NamePath,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// A field was created or destroyed.
    FieldsChanged {
        changed: Vec<FieldValue>,
        all: Vec<FieldValue>,
    },
    /// One or more values changed. `changed` holds only the written paths,
    /// `all` is the full snapshot after every write was applied.
    ValuesChanged {
        paths: Vec<NamePath>,
        changed: Value,
        all: Rc<Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Rc<dyn Fn(&FormEvent)>;

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    pub(crate) fn add(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Listeners are cloned out so they may subscribe or unsubscribe while
    /// being called.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
    }
}
