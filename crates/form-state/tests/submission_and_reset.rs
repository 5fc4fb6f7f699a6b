mod common;

use std::cell::RefCell;
use std::rc::Rc;

use form_state::{
    name_path, FieldErrors, FieldItem, FieldItemProps, Form, FormConfig, FormError, FormOptions,
    TransformBehavior, TransformError, TransformResult,
};
use futures::executor::block_on;
use serde_json::{json, Value};

use common::bindings::StaticBinding;
use common::init_tracing;

struct Outcome {
    finished: Rc<RefCell<Vec<Value>>>,
    failed: Rc<RefCell<Vec<Vec<FieldErrors>>>>,
}

fn form_with_callbacks(config: FormConfig) -> (Form, Outcome) {
    let finished = Rc::new(RefCell::new(Vec::new()));
    let failed = Rc::new(RefCell::new(Vec::new()));
    let (on_finish, on_failed) = (Rc::clone(&finished), Rc::clone(&failed));
    let options = FormOptions::new(config)
        .on_finish(move |values| on_finish.borrow_mut().push(values.clone()))
        .on_finish_failed(move |errors| on_failed.borrow_mut().push(errors.to_vec()));
    (Form::new(options), Outcome { finished, failed })
}

#[test]
fn submit_reports_values_when_valid() {
    let (form, outcome) = form_with_callbacks(FormConfig::default());
    let name = FieldItem::mount(
        &form,
        FieldItemProps::new(name_path!["user", "name"]).label("Name").required(true),
    );
    let _nickname = FieldItem::mount(&form, FieldItemProps::new(name_path!["user", "nickname"]));
    block_on(name.change(json!("Ada")));

    let submitted = block_on(form.submit()).unwrap();
    assert_eq!(submitted, Some(json!({"user": {"name": "Ada"}})));
    assert_eq!(*outcome.finished.borrow(), vec![json!({"user": {"name": "Ada"}})]);
    assert!(outcome.failed.borrow().is_empty());
}

#[test]
fn submit_reports_errors_when_invalid() {
    let (form, outcome) = form_with_callbacks(FormConfig::default());
    let _name = FieldItem::mount(&form, FieldItemProps::new("name").label("Name").required(true));

    assert_eq!(block_on(form.submit()).unwrap(), None);
    assert!(outcome.finished.borrow().is_empty());
    assert_eq!(
        *outcome.failed.borrow(),
        vec![vec![FieldErrors {
            path: name_path!["name"],
            errors: vec!["Name is required".into()],
        }]]
    );
}

#[test]
fn merge_transform_lands_at_root() {
    let form = Form::default();
    let range = FieldItem::mount(
        &form,
        FieldItemProps::new("range").transform(|value: Option<Value>| async move {
            let value = value.unwrap_or(Value::Null);
            Ok(json!({"start": value[0].clone(), "end": value[1].clone()}))
        }),
    );
    block_on(range.change(json!(["mon", "fri"])));

    assert_eq!(
        block_on(form.get_fields_formatted_value(None)).unwrap(),
        json!({"start": "mon", "end": "fri"})
    );
}

#[test]
fn replace_transform_lands_at_field_path() {
    let config = FormConfig {
        transform_behavior: TransformBehavior::Replace,
        ..FormConfig::default()
    };
    let form = Form::with_config(config);
    let age = FieldItem::mount(
        &form,
        FieldItemProps::new(name_path!["profile", "age"]).transform(|value: Option<Value>| async move {
            let text = value.as_ref().and_then(Value::as_str).unwrap_or("0").to_string();
            text.parse::<u64>()
                .map(Value::from)
                .map_err(|err| TransformError::Rejected(err.to_string()))
        }),
    );
    block_on(age.change(json!("42")));

    assert_eq!(
        block_on(form.submit()).unwrap(),
        Some(json!({"profile": {"age": 42}}))
    );
}

#[test]
fn latest_binding_owns_the_transform() {
    let form = Form::default();
    let path = name_path!["code"];
    let older = StaticBinding::transforming(Ok(TransformResult {
        value: json!("older"),
        merge_into_root: false,
    }));
    let newer = StaticBinding::transforming(Ok(TransformResult {
        value: json!("newer"),
        merge_into_root: false,
    }));
    form.register_field(&path, &older, Some(json!("raw")));
    form.register_field(&path, &newer, None);

    assert_eq!(
        block_on(form.get_fields_formatted_value(None)).unwrap(),
        json!({"code": "newer"})
    );
}

#[test]
fn rejected_transform_aborts_submission() {
    init_tracing();
    let (form, outcome) = form_with_callbacks(FormConfig::default());
    let binding = StaticBinding::transforming(Err(TransformError::Rejected("bad date".into())));
    form.register_field(&name_path!["date"], &binding, Some(json!("2024-13-01")));

    let result = block_on(form.submit());
    assert!(matches!(
        result,
        Err(FormError::Transform { ref path, .. }) if *path == name_path!["date"]
    ));
    assert!(outcome.finished.borrow().is_empty());
    assert!(outcome.failed.borrow().is_empty());
}

#[test]
fn nulls_are_stripped_unless_disabled() {
    for (omit_nil, expected) in [
        (true, json!({"meta": {"b": 1}})),
        (false, json!({"note": null, "meta": {"a": null, "b": 1}})),
    ] {
        let config = FormConfig {
            omit_nil,
            ..FormConfig::default()
        };
        let form = Form::with_config(config);
        let binding = StaticBinding::valid();
        form.register_field(&name_path!["note"], &binding, Some(Value::Null));
        form.register_field(&name_path!["meta"], &binding, Some(json!({"a": null, "b": 1})));

        assert_eq!(block_on(form.submit()).unwrap(), Some(expected));
    }
}

#[test]
fn subset_formatting_respects_paths() {
    let form = Form::default();
    let binding = StaticBinding::valid();
    form.register_field(&name_path!["a"], &binding, Some(json!(1)));
    form.register_field(&name_path!["b"], &binding, Some(json!(2)));

    assert_eq!(
        block_on(form.get_fields_formatted_value(Some(&[name_path!["b"]]))).unwrap(),
        json!({"b": 2})
    );
}

#[test]
fn reset_restores_initial_values_and_touched() {
    let config = FormConfig {
        initial_values: json!({"city": "Paris"}),
        ..FormConfig::default()
    };
    let form = Form::with_config(config);
    let name = FieldItem::mount(&form, FieldItemProps::new("name").initial_value(json!("Ada")));
    let city = FieldItem::mount(&form, FieldItemProps::new("city"));
    let note = FieldItem::mount(&form, FieldItemProps::new("note"));
    block_on(form.settle());

    block_on(name.change(json!("Grace")));
    block_on(city.change(json!("Rome")));
    block_on(note.change(json!("hi")));
    form.set_field_error(&name_path!["name"], vec!["stale".into()]);

    form.reset();
    assert_eq!(name.value(), Some(json!("Ada")));
    assert_eq!(city.value(), Some(json!("Paris")));
    assert_eq!(note.value(), None);
    assert!(!form.is_fields_touched(None, false));
    // errors survive a reset by default
    assert_eq!(name.state().errors, vec!["stale".to_string()]);
}

#[test]
fn reset_can_clear_errors() {
    let config = FormConfig::from_json(r#"{"resetClearsErrors": true}"#).unwrap();
    let form = Form::with_config(config);
    let name = FieldItem::mount(&form, FieldItemProps::new("name").required(true));
    block_on(form.validate_fields(None));
    assert_eq!(name.state().errors.len(), 1);

    form.reset();
    assert!(name.state().errors.is_empty());
}

#[test]
fn reset_fields_targets_a_subset() {
    let form = Form::default();
    let a = FieldItem::mount(&form, FieldItemProps::new("a").initial_value(json!(0)));
    let b = FieldItem::mount(&form, FieldItemProps::new("b").initial_value(json!(0)));
    block_on(a.change(json!(1)));
    block_on(b.change(json!(1)));

    form.reset_fields(Some(&[name_path!["a"]]));
    block_on(form.settle());
    assert_eq!(a.value(), Some(json!(0)));
    assert_eq!(b.value(), Some(json!(1)));
    assert!(!a.state().touched);
    assert!(b.state().touched);
}
