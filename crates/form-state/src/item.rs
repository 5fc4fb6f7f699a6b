//! Standard bindings.
//!
//! [`FieldItem`] is the engine-side half of an editable form item: it owns
//! the rules, label and transform for one path. [`KeepAlive`] holds paths
//! registered while no editor is mounted for them.

use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use form_state_path::NamePath;
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::binding::{Binding, TransformResult};
use crate::config::{ItemConfig, ResolvedItemConfig, TransformBehavior};
use crate::error::TransformError;
use crate::form::{Form, RequiredMessageFn};
use crate::rules::{validate_rules, Rule};

pub type TransformFn =
    Rc<dyn Fn(Option<Value>) -> LocalBoxFuture<'static, Result<Value, TransformError>>>;

/// Everything a [`FieldItem`] is mounted with.
pub struct FieldItemProps {
    pub name: NamePath,
    pub label: String,
    pub required: bool,
    pub rules: Vec<Rule>,
    pub dependencies: Vec<NamePath>,
    pub initial_value: Option<Value>,
    pub transform: Option<TransformFn>,
    pub config: ItemConfig,
    pub get_required_message: Option<RequiredMessageFn>,
    /// Revalidate after every [`FieldItem::change`].
    pub validate_on_change: bool,
}

impl FieldItemProps {
    pub fn new(name: impl Into<NamePath>) -> Self {
        FieldItemProps {
            name: name.into(),
            label: String::new(),
            required: false,
            rules: Vec::new(),
            dependencies: Vec::new(),
            initial_value: None,
            transform: None,
            config: ItemConfig::default(),
            get_required_message: None,
            validate_on_change: true,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn dependencies(mut self, dependencies: impl IntoIterator<Item = NamePath>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn transform<F, Fut>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, TransformError>> + 'static,
    {
        self.transform = Some(Rc::new(move |value| Box::pin(transform(value))));
        self
    }

    pub fn config(mut self, config: ItemConfig) -> Self {
        self.config = config;
        self
    }

    pub fn required_message(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.get_required_message = Some(Rc::new(f));
        self
    }

    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }
}

/// What a presentation layer needs to render an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldState {
    pub value: Option<Value>,
    pub errors: Vec<String>,
    pub touched: bool,
    /// Errors are displayed next to the editor.
    pub show_errors: bool,
    /// Errors are also handed to the editor itself.
    pub passthrough_errors: bool,
}

pub struct FieldItem {
    form: Form,
    path: NamePath,
    label: String,
    rules: Vec<Rule>,
    dependencies: Vec<NamePath>,
    transform: Option<TransformFn>,
    config: ResolvedItemConfig,
    validate_on_change: bool,
}

impl FieldItem {
    /// Registers a new item with `form` and declares its dependencies.
    ///
    /// A `required` item gets a leading required rule unless its rules
    /// already contain one.
    pub fn mount(form: &Form, props: FieldItemProps) -> Rc<FieldItem> {
        let FieldItemProps {
            name,
            label,
            required,
            mut rules,
            dependencies,
            initial_value,
            transform,
            config,
            get_required_message,
            validate_on_change,
        } = props;

        if required && !rules.iter().any(Rule::is_required) {
            let message = match &get_required_message {
                Some(f) => f(&label),
                None => form.required_message(&label),
            };
            rules.insert(0, Rule::required(message));
        }

        let item = Rc::new(FieldItem {
            form: form.clone(),
            path: name,
            label,
            rules,
            dependencies,
            transform,
            config: config.resolve(form.config()),
            validate_on_change,
        });

        let binding: Rc<dyn Binding> = item.clone();
        form.register_field(&item.path, &binding, initial_value);
        if !item.dependencies.is_empty() {
            form.watch_dependencies(&item.path, item.dependencies.clone());
        }
        debug!(field = %item.path, label = %item.label, "item mounted");
        item
    }

    pub fn unmount(self: &Rc<Self>) {
        let binding: Rc<dyn Binding> = self.clone();
        self.form.unregister_field(&self.path, &binding);
    }

    pub fn path(&self) -> &NamePath {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &ResolvedItemConfig {
        &self.config
    }

    pub fn value(&self) -> Option<Value> {
        self.form.get_field_value(&self.path)
    }

    /// Writes `value` as the user's input and, unless disabled, validates it.
    pub async fn change(&self, value: Value) -> Option<Vec<String>> {
        self.form.set_field_value(&self.path, value.clone());
        if self.validate_on_change {
            self.validate(Some(value)).await
        } else {
            None
        }
    }

    pub fn state(&self) -> FieldState {
        let field = self.form.get_field(&self.path);
        FieldState {
            value: field.as_ref().and_then(|f| f.value.clone()),
            errors: field.as_ref().map(|f| f.errors.clone()).unwrap_or_default(),
            touched: field.as_ref().is_some_and(|f| f.touched),
            show_errors: self.config.show_errors,
            passthrough_errors: self.config.passthrough_errors,
        }
    }
}

#[async_trait(?Send)]
impl Binding for FieldItem {
    /// Runs this item's rules and stores the outcome as the field's errors.
    async fn validate(&self, override_value: Option<Value>) -> Option<Vec<String>> {
        let value = override_value.or_else(|| self.value());
        let errors = validate_rules(value.as_ref(), &self.rules, self.config.validate_first).await;
        if self.form.has_field(&self.path) {
            self.form
                .set_field_error(&self.path, errors.clone().unwrap_or_default());
        } else {
            trace!(field = %self.path, "item unmounted while validating");
        }
        errors
    }

    async fn transform(&self) -> Result<Option<TransformResult>, TransformError> {
        let Some(transform) = &self.transform else {
            return Ok(None);
        };
        let value = transform(self.value()).await?;
        Ok(Some(TransformResult {
            value,
            merge_into_root: self.config.transform_behavior == TransformBehavior::Merge,
        }))
    }
}

/// Keeps a set of paths registered, so their values survive while no
/// editor is mounted for them. Contributes no errors and no transform.
pub struct KeepAlive {
    form: Form,
    paths: Vec<NamePath>,
}

impl KeepAlive {
    pub fn mount(form: &Form, paths: impl IntoIterator<Item = NamePath>) -> Rc<KeepAlive> {
        let mut unique = IndexMap::new();
        for path in paths {
            unique.entry(path.key()).or_insert(path);
        }
        let keep_alive = Rc::new(KeepAlive {
            form: form.clone(),
            paths: unique.into_values().collect(),
        });
        let binding: Rc<dyn Binding> = keep_alive.clone();
        for path in &keep_alive.paths {
            form.register_field(path, &binding, None);
        }
        keep_alive
    }

    pub fn unmount(self: &Rc<Self>) {
        let binding: Rc<dyn Binding> = self.clone();
        for path in &self.paths {
            self.form.unregister_field(path, &binding);
        }
    }

    pub fn paths(&self) -> &[NamePath] {
        &self.paths
    }
}

#[async_trait(?Send)]
impl Binding for KeepAlive {
    async fn validate(&self, _: Option<Value>) -> Option<Vec<String>> {
        None
    }
}
