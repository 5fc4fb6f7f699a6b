//! The form handle.
//!
//! A [`Form`] owns one registry, one value tree, and the watchers that react
//! to value changes. It is a cheap `Rc` handle: bindings keep a clone so they
//! can read values and report errors.
//!
//! Scheduling is cooperative and single threaded. `set_field_value` notifies
//! synchronously. `set_fields` (and every internal batch) commits at once but
//! its notification is deferred to the next [`Form::tick`], coalescing any
//! batches committed in between. Revalidations triggered by dependencies are
//! queued as local tasks and driven by [`Form::settle`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use form_state_path::{self as nav, NamePath};
use futures::future::{join_all, LocalBoxFuture};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::binding::Binding;
use crate::config::FormConfig;
use crate::dependency::DependencyNotifier;
use crate::events::{FieldValue, FormEvent, Listener, SubscriptionId, Subscribers};
use crate::registry::{
    Field, FieldErrors, FieldRegistry, FieldSnapshot, Registration, Unregistration,
};
use crate::sync::{SyncCoordinator, SyncId, SyncSpec};
use crate::value_tree::{FieldUpdate, ValueTree};

/// Upper bound on tick/task rounds in one [`Form::settle`] call.
const MAX_SETTLE_ROUNDS: usize = 64;

pub type RequiredMessageFn = Rc<dyn Fn(&str) -> String>;
pub type FinishFn = Box<dyn Fn(&Value)>;
pub type FinishFailedFn = Box<dyn Fn(&[FieldErrors])>;

fn default_required_message(label: &str) -> String {
    format!("{label} is required")
}

/// Construction options: the serializable [`FormConfig`] plus callbacks.
pub struct FormOptions {
    pub config: FormConfig,
    pub get_required_message: RequiredMessageFn,
    pub on_finish: Option<FinishFn>,
    pub on_finish_failed: Option<FinishFailedFn>,
}

impl Default for FormOptions {
    fn default() -> Self {
        FormOptions {
            config: FormConfig::default(),
            get_required_message: Rc::new(default_required_message),
            on_finish: None,
            on_finish_failed: None,
        }
    }
}

impl FormOptions {
    pub fn new(config: FormConfig) -> Self {
        FormOptions {
            config,
            ..FormOptions::default()
        }
    }

    pub fn required_message(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.get_required_message = Rc::new(f);
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn on_finish_failed(mut self, f: impl Fn(&[FieldErrors]) + 'static) -> Self {
        self.on_finish_failed = Some(Box::new(f));
        self
    }
}

/// Writes committed by batches but not yet announced.
#[derive(Debug, Default)]
struct PendingChange {
    paths: Vec<NamePath>,
    changed: Map<String, Value>,
}

impl PendingChange {
    fn record(&mut self, path: &NamePath, value: Option<&Value>) {
        if !self.paths.contains(path) {
            self.paths.push(path.clone());
        }
        let mut changed = Value::Object(std::mem::take(&mut self.changed));
        match value {
            Some(value) => {
                if let Err(err) = nav::set(&mut changed, path, value.clone()) {
                    trace!(field = %path, error = %err, "change not recorded");
                }
            }
            None => {
                nav::unset(&mut changed, path);
            }
        }
        if let Value::Object(map) = changed {
            self.changed = map;
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FormState {
    pub(crate) registry: FieldRegistry,
    pub(crate) tree: ValueTree,
    pending: Option<PendingChange>,
}

impl FormState {
    fn field_values(&self) -> Vec<FieldValue> {
        self.registry
            .iter()
            .map(|f| FieldValue {
                path: f.path.clone(),
                value: self.tree.get(&f.path).cloned(),
            })
            .collect()
    }

    /// Applies a batch to the tree and registry and queues its notification.
    pub(crate) fn commit(&mut self, updates: &[FieldUpdate]) {
        let applied = self.tree.apply(updates);
        if applied.is_empty() {
            return;
        }
        let pending = self.pending.get_or_insert_with(PendingChange::default);
        for update in applied {
            if let Some(touched) = update.touched {
                self.registry.set_touched(&update.path, touched);
            }
            pending.record(&update.path, update.value.as_ref());
        }
    }
}

pub(crate) struct FormInner {
    pub(crate) config: FormConfig,
    pub(crate) get_required_message: RequiredMessageFn,
    pub(crate) on_finish: Option<FinishFn>,
    pub(crate) on_finish_failed: Option<FinishFailedFn>,
    pub(crate) state: RefCell<FormState>,
    dependencies: RefCell<DependencyNotifier>,
    syncs: RefCell<SyncCoordinator>,
    subscribers: RefCell<Subscribers>,
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

#[derive(Clone)]
pub struct Form {
    pub(crate) inner: Rc<FormInner>,
}

impl Default for Form {
    fn default() -> Self {
        Form::new(FormOptions::default())
    }
}

impl Form {
    pub fn new(options: FormOptions) -> Self {
        Form {
            inner: Rc::new(FormInner {
                config: options.config,
                get_required_message: options.get_required_message,
                on_finish: options.on_finish,
                on_finish_failed: options.on_finish_failed,
                state: RefCell::new(FormState::default()),
                dependencies: RefCell::new(DependencyNotifier::new()),
                syncs: RefCell::new(SyncCoordinator::new()),
                subscribers: RefCell::new(Subscribers::default()),
                tasks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn with_config(config: FormConfig) -> Self {
        Form::new(FormOptions::new(config))
    }

    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    /// How often a host should call [`Form::tick`].
    pub fn tick_interval(&self) -> Duration {
        self.inner.config.tick_interval()
    }

    pub fn required_message(&self, label: &str) -> String {
        (self.inner.get_required_message)(label)
    }

    /// Form-level initial value at `path`.
    pub fn initial_value(&self, path: &NamePath) -> Option<Value> {
        nav::get(&self.inner.config.initial_values, path).cloned()
    }

    // ── Registration ─────────────────────────────────────────────────────

    /// Registers `binding` for `path`.
    ///
    /// The first registration creates the field and seeds its value from
    /// `initial_value`, else the form-level initial value at `path`. Later
    /// registrations only attach the binding.
    pub fn register_field(
        &self,
        path: &NamePath,
        binding: &Rc<dyn Binding>,
        initial_value: Option<Value>,
    ) {
        let event = {
            let mut state = self.inner.state.borrow_mut();
            let seed = initial_value.clone().or_else(|| self.initial_value(path));
            match state.registry.register(path, binding, initial_value) {
                Registration::Attached { ref_count } => {
                    warn!(field = %path, ref_count, "field is already registered; attaching another binding");
                    None
                }
                Registration::Created => {
                    debug!(field = %path, "field registered");
                    state.commit(&[FieldUpdate::new(path.clone(), seed.clone())]);
                    Some(FormEvent::FieldsChanged {
                        changed: vec![FieldValue {
                            path: path.clone(),
                            value: seed,
                        }],
                        all: state.field_values(),
                    })
                }
            }
        };
        if let Some(event) = event {
            self.emit(&event);
        }
    }

    /// Detaches `binding` from `path`, destroying the field and unsetting its
    /// value when it was the last one.
    pub fn unregister_field(&self, path: &NamePath, binding: &Rc<dyn Binding>) {
        let event = {
            let mut state = self.inner.state.borrow_mut();
            match state.registry.unregister(path, binding) {
                Unregistration::NotRegistered => {
                    warn!(field = %path, "attempted to unregister a field that was never registered");
                    None
                }
                Unregistration::UnknownBinding => {
                    warn!(field = %path, "attempted to unregister a binding that is not attached");
                    None
                }
                Unregistration::Detached { ref_count } => {
                    debug!(field = %path, ref_count, "binding detached");
                    None
                }
                Unregistration::Removed(field) => {
                    debug!(field = %path, "field removed");
                    let value = state.tree.get(&field.path).cloned();
                    state.commit(&[FieldUpdate::unset(field.path.clone())]);
                    Some(FormEvent::FieldsChanged {
                        changed: vec![FieldValue {
                            path: field.path,
                            value,
                        }],
                        all: state.field_values(),
                    })
                }
            }
        };
        if let Some(event) = event {
            self.inner.dependencies.borrow_mut().unwatch(path);
            self.emit(&event);
        }
    }

    pub fn has_field(&self, path: &NamePath) -> bool {
        self.inner.state.borrow().registry.contains(path)
    }

    /// Canonical paths of every field, in registration order.
    pub fn field_paths(&self) -> Vec<NamePath> {
        self.inner.state.borrow().registry.paths()
    }

    // ── Field metadata ───────────────────────────────────────────────────

    pub fn get_field(&self, path: &NamePath) -> Option<FieldSnapshot> {
        let state = self.inner.state.borrow();
        let field = state.registry.get(path)?;
        Some(FieldSnapshot {
            path: field.path.clone(),
            touched: field.touched,
            errors: field.errors.clone(),
            value: state.tree.get(&field.path).cloned(),
            ref_count: field.ref_count(),
        })
    }

    /// Snapshots of the requested fields, or of all fields.
    pub fn get_fields(&self, paths: Option<&[NamePath]>) -> Vec<FieldSnapshot> {
        let targets = self.resolve_targets(paths, "get");
        targets.iter().filter_map(|p| self.get_field(p)).collect()
    }

    pub fn set_field_touched(&self, path: &NamePath, touched: bool) {
        if !self.inner.state.borrow_mut().registry.set_touched(path, touched) {
            warn!(field = %path, "attempted to set touched on a field that was never registered");
        }
    }

    pub fn set_field_error(&self, path: &NamePath, errors: Vec<String>) {
        if !self.inner.state.borrow_mut().registry.set_errors(path, errors) {
            warn!(field = %path, "attempted to set errors for a field that was never registered");
        }
    }

    pub fn get_field_error(&self, path: &NamePath) -> Vec<String> {
        match self.inner.state.borrow().registry.get(path) {
            Some(field) => field.errors.clone(),
            None => {
                warn!(field = %path, "attempted to get errors for a field that was never registered");
                Vec::new()
            }
        }
    }

    /// With `all_touched`, every targeted field must be touched; otherwise
    /// any one suffices.
    pub fn is_fields_touched(&self, paths: Option<&[NamePath]>, all_touched: bool) -> bool {
        let targets = self.resolve_targets(paths, "check touched on");
        let state = self.inner.state.borrow();
        let mut touched = targets
            .iter()
            .filter_map(|p| state.registry.get(p))
            .map(|f| f.touched);
        if all_touched {
            touched.all(|t| t)
        } else {
            touched.any(|t| t)
        }
    }

    /// The requested paths that are registered (warning about the rest), or
    /// every registered path.
    pub(crate) fn resolve_targets(&self, paths: Option<&[NamePath]>, action: &str) -> Vec<NamePath> {
        let state = self.inner.state.borrow();
        match paths {
            None => state.registry.paths(),
            Some(paths) => paths
                .iter()
                .filter(|p| {
                    let known = state.registry.contains(p);
                    if !known {
                        warn!(field = %p, "attempted to {action} a field that was never registered");
                    }
                    known
                })
                .cloned()
                .collect(),
        }
    }

    // ── Values ───────────────────────────────────────────────────────────

    pub fn get_field_value(&self, path: &NamePath) -> Option<Value> {
        self.inner.state.borrow().tree.get(path).cloned()
    }

    /// The whole tree, or a pruned tree holding only `paths`.
    pub fn get_fields_value(&self, paths: Option<&[NamePath]>) -> Value {
        let state = self.inner.state.borrow();
        match paths {
            None => state.tree.root().clone(),
            Some(paths) => state.tree.pick(paths),
        }
    }

    /// Writes one value, marks the field touched, and notifies at once.
    pub fn set_field_value(&self, path: &NamePath, value: Value) {
        let notification = {
            let mut state = self.inner.state.borrow_mut();
            if !state.registry.contains(path) {
                warn!(field = %path, "attempted to set value for a field that was never registered");
                return;
            }
            if let Err(err) = state.tree.set(path, Some(value.clone())) {
                warn!(field = %path, error = %err, "value not written");
                return;
            }
            state.registry.set_touched(path, true);
            let mut pending = PendingChange::default();
            pending.record(path, Some(&value));
            (pending.paths, Value::Object(pending.changed), state.tree.snapshot())
        };
        let (paths, changed, all) = notification;
        self.dispatch(paths, changed, all);
    }

    /// Applies a batch atomically. Its notification is delivered on the next
    /// tick, coalesced with any other batch committed before then.
    pub fn set_fields(&self, updates: Vec<FieldUpdate>) {
        let mut state = self.inner.state.borrow_mut();
        let accepted: Vec<FieldUpdate> = updates
            .into_iter()
            .filter(|u| {
                let known = state.registry.contains(&u.path);
                if !known {
                    warn!(field = %u.path, "attempted to set a field that was never registered");
                }
                known
            })
            .collect();
        if accepted.is_empty() {
            return;
        }
        trace!(count = accepted.len(), "batch committed");
        state.commit(&accepted);
    }

    // ── Validation ───────────────────────────────────────────────────────

    /// Runs every binding's `validate` for the targeted fields (all fields
    /// when `paths` is `None`) and stores the union of their messages.
    ///
    /// Returns the failing fields, or `None` when all passed. Results for a
    /// field that was unregistered while validating are discarded.
    pub async fn validate_fields(&self, paths: Option<&[NamePath]>) -> Option<Vec<FieldErrors>> {
        let targets = self.resolve_targets(paths, "validate");
        let mut failed = Vec::new();

        for path in targets {
            let live = self
                .inner
                .state
                .borrow()
                .registry
                .get(&path)
                .map(Field::live_bindings);
            let bindings = match live {
                Some(Some(bindings)) => bindings,
                Some(None) => {
                    warn!(field = %path, "skipping validation of a field with a missing binding");
                    continue;
                }
                None => continue,
            };

            let results = join_all(bindings.iter().map(|b| b.validate(None))).await;
            let errors: Vec<String> = results
                .into_iter()
                .flatten()
                .flatten()
                .collect::<IndexSet<String>>()
                .into_iter()
                .collect();

            if !self
                .inner
                .state
                .borrow_mut()
                .registry
                .set_errors(&path, errors.clone())
            {
                debug!(field = %path, "field unregistered while validating; discarding result");
                continue;
            }
            if !errors.is_empty() {
                failed.push(FieldErrors { path, errors });
            }
        }

        if failed.is_empty() {
            None
        } else {
            Some(failed)
        }
    }

    // ── Watchers ─────────────────────────────────────────────────────────

    /// Revalidates `field` whenever any of `dependencies` changes, once the
    /// field is touched.
    pub fn watch_dependencies(&self, field: &NamePath, dependencies: Vec<NamePath>) {
        let state = self.inner.state.borrow();
        self.inner
            .dependencies
            .borrow_mut()
            .watch(field, dependencies, state.tree.root());
    }

    pub fn unwatch_dependencies(&self, field: &NamePath) {
        self.inner.dependencies.borrow_mut().unwatch(field);
    }

    /// Adds a sync and evaluates it once, so values already present are
    /// propagated on the next tick.
    pub fn add_sync(&self, spec: SyncSpec) -> SyncId {
        let (id, batch) = {
            let state = self.inner.state.borrow();
            let mut syncs = self.inner.syncs.borrow_mut();
            let id = syncs.add(spec);
            (id, syncs.evaluate(id, state.tree.root()))
        };
        if let Some(batch) = batch {
            self.set_fields(batch);
        }
        id
    }

    pub fn remove_sync(&self, id: SyncId) -> bool {
        self.inner.syncs.borrow_mut().remove(id)
    }

    pub fn subscribe(&self, listener: impl Fn(&FormEvent) + 'static) -> SubscriptionId {
        let listener: Listener = Rc::new(listener);
        self.inner.subscribers.borrow_mut().add(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.borrow_mut().remove(id)
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    /// Delivers the pending batch notification, if any. Returns whether one
    /// was delivered.
    pub fn tick(&self) -> bool {
        let (pending, all) = {
            let mut state = self.inner.state.borrow_mut();
            let pending = state.pending.take();
            (pending, state.tree.snapshot())
        };
        match pending {
            Some(pending) => {
                self.dispatch(pending.paths, Value::Object(pending.changed), all);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner.state.borrow().pending.is_some() || !self.inner.tasks.borrow().is_empty()
    }

    /// Alternates ticks and queued tasks until nothing is left to do.
    pub async fn settle(&self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let delivered = self.tick();
            let tasks = std::mem::take(&mut *self.inner.tasks.borrow_mut());
            if !delivered && tasks.is_empty() {
                return;
            }
            join_all(tasks).await;
        }
        warn!(rounds = MAX_SETTLE_ROUNDS, "form did not settle; giving up");
    }

    pub(crate) fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        self.inner.tasks.borrow_mut().push(task);
    }

    fn emit(&self, event: &FormEvent) {
        let listeners = self.inner.subscribers.borrow().snapshot();
        for listener in listeners {
            listener(event);
        }
    }

    /// Announces a committed change to subscribers, the dependency notifier,
    /// and the sync coordinator.
    fn dispatch(&self, paths: Vec<NamePath>, changed: Value, all: Rc<Value>) {
        self.emit(&FormEvent::ValuesChanged {
            paths,
            changed,
            all: Rc::clone(&all),
        });

        let triggered = {
            let state = self.inner.state.borrow();
            self.inner.dependencies.borrow_mut().on_change(&all, |field| {
                state.registry.get(field).is_some_and(|f| f.touched)
            })
        };
        for field in triggered {
            let form = self.clone();
            self.spawn_local(Box::pin(async move {
                form.validate_fields(Some(std::slice::from_ref(&field))).await;
            }));
        }

        let batches = self.inner.syncs.borrow_mut().on_change(&all);
        for batch in batches {
            self.set_fields(batch);
        }
    }
}
