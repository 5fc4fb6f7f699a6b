#![allow(dead_code)]

pub mod bindings;

use std::cell::RefCell;
use std::rc::Rc;

use form_state::{Form, FormEvent};
use tracing_subscriber::EnvFilter;

/// Routes engine diagnostics to the test output. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects every event delivered to subscribers of `form`.
pub fn record_events(form: &Form) -> Rc<RefCell<Vec<FormEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    form.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

pub fn values_changed_count(events: &[FormEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, FormEvent::ValuesChanged { .. }))
        .count()
}

pub fn fields_changed_count(events: &[FormEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, FormEvent::FieldsChanged { .. }))
        .count()
}
