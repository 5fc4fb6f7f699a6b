//! Form-level configuration and per-item overrides.
//!
//! [`FormConfig`] is plain data and deserializes from JSON with camelCase
//! keys. Items inherit every setting unless their [`ItemConfig`] overrides
//! it.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Horizontal,
    #[default]
    Vertical,
}

/// How a transform result is folded into the submitted value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformBehavior {
    /// Deep-merge the transformed value at the root, ignoring the field path.
    #[default]
    Merge,
    /// Assign the transformed value at the field's own path.
    Replace,
}

/// Rule execution mode.
///
/// In JSON this is `true` (stop at first), `false` (collect all) or
/// `"parallel"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidateFirst {
    #[default]
    StopAtFirst,
    CollectAll,
    Parallel,
}

impl Serialize for ValidateFirst {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValidateFirst::StopAtFirst => serializer.serialize_bool(true),
            ValidateFirst::CollectAll => serializer.serialize_bool(false),
            ValidateFirst::Parallel => serializer.serialize_str("parallel"),
        }
    }
}

impl<'de> Deserialize<'de> for ValidateFirst {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ModeVisitor;

        impl Visitor<'_> for ModeVisitor {
            type Value = ValidateFirst;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a boolean or \"parallel\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(if v {
                    ValidateFirst::StopAtFirst
                } else {
                    ValidateFirst::CollectAll
                })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v {
                    "parallel" => Ok(ValidateFirst::Parallel),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(ModeVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    pub colon: bool,
    /// Opaque style bag handed to label renderers.
    pub label_props: Value,
    pub layout: Layout,
    pub validate_first: ValidateFirst,
    pub show_errors: bool,
    /// Whether items hand their error state to the bound input as well.
    pub passthrough_errors: bool,
    pub transform_behavior: TransformBehavior,
    /// Interval in milliseconds at which hosts should call `Form::tick`.
    pub update_tick_limit: u64,
    /// Strip `null` entries from the submitted value.
    pub omit_nil: bool,
    /// Clear a field's errors when it is reset.
    pub reset_clears_errors: bool,
    pub initial_values: Value,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            colon: true,
            label_props: Value::Object(Map::new()),
            layout: Layout::Vertical,
            validate_first: ValidateFirst::StopAtFirst,
            show_errors: true,
            passthrough_errors: false,
            transform_behavior: TransformBehavior::Merge,
            update_tick_limit: 50,
            omit_nil: true,
            reset_clears_errors: false,
            initial_values: Value::Object(Map::new()),
        }
    }
}

impl FormConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.update_tick_limit)
    }
}

/// Per-item overrides. `None` inherits from the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemConfig {
    pub colon: Option<bool>,
    pub label_props: Option<Value>,
    pub layout: Option<Layout>,
    pub validate_first: Option<ValidateFirst>,
    pub show_errors: Option<bool>,
    pub passthrough_errors: Option<bool>,
}

/// Item settings after falling back to the form configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItemConfig {
    pub colon: bool,
    pub label_props: Value,
    pub layout: Layout,
    pub validate_first: ValidateFirst,
    pub show_errors: bool,
    pub passthrough_errors: bool,
    pub transform_behavior: TransformBehavior,
    pub update_tick_limit: u64,
}

impl ItemConfig {
    pub fn resolve(&self, form: &FormConfig) -> ResolvedItemConfig {
        ResolvedItemConfig {
            colon: self.colon.unwrap_or(form.colon),
            label_props: self
                .label_props
                .clone()
                .unwrap_or_else(|| form.label_props.clone()),
            layout: self.layout.unwrap_or(form.layout),
            validate_first: self.validate_first.unwrap_or(form.validate_first),
            show_errors: self.show_errors.unwrap_or(form.show_errors),
            passthrough_errors: self.passthrough_errors.unwrap_or(form.passthrough_errors),
            transform_behavior: form.transform_behavior,
            update_tick_limit: form.update_tick_limit,
        }
    }
}
