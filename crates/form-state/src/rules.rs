//! Rule evaluation.
//!
//! Every rule kind except [`Rule::Required`] passes on an empty value, so
//! `required` is the only way to demand input.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use form_state_util::is_empty;
use futures::future::{join_all, LocalBoxFuture};
use regex::Regex;
use serde_json::Value;
use tracing::{trace, warn};

use crate::config::ValidateFirst;
use crate::error::RuleError;

pub type ValidatorFuture = LocalBoxFuture<'static, Result<Option<String>, RuleError>>;

/// An async validator. Resolves to its own message, or `None` when valid.
pub type ValidatorFn = Rc<dyn Fn(Value) -> ValidatorFuture>;

#[derive(Clone)]
pub enum Rule {
    Required {
        message: String,
    },
    Pattern {
        pattern: Regex,
        message: String,
    },
    /// Bounds on string length (in chars) or array length. Absent bounds
    /// are unbounded.
    Length {
        min: Option<usize>,
        max: Option<usize>,
        message: String,
    },
    Custom(ValidatorFn),
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required { message } => f.debug_struct("Required").field("message", message).finish(),
            Rule::Pattern { pattern, message } => f
                .debug_struct("Pattern")
                .field("pattern", &pattern.as_str())
                .field("message", message)
                .finish(),
            Rule::Length { min, max, message } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .field("message", message)
                .finish(),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Rule {
    pub fn required(message: impl Into<String>) -> Self {
        Rule::Required {
            message: message.into(),
        }
    }

    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Rule::Pattern {
            pattern: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    pub fn length(min: Option<usize>, max: Option<usize>, message: impl Into<String>) -> Self {
        Rule::Length {
            min,
            max,
            message: message.into(),
        }
    }

    pub fn min(min: usize, message: impl Into<String>) -> Self {
        Rule::length(Some(min), None, message)
    }

    pub fn max(max: usize, message: impl Into<String>) -> Self {
        Rule::length(None, Some(max), message)
    }

    pub fn custom<F, Fut>(validator: F) -> Self
    where
        F: Fn(Value) -> Fut + 'static,
        Fut: Future<Output = Result<Option<String>, RuleError>> + 'static,
    {
        Rule::Custom(Rc::new(move |value| Box::pin(validator(value))))
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Rule::Required { .. })
    }
}

/// The string a pattern is matched against.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(arr) => Some(arr.len()),
        _ => None,
    }
}

/// Evaluates one rule, returning its message on failure.
pub async fn check_rule(rule: &Rule, value: Option<&Value>) -> Option<String> {
    let empty = is_empty(value);
    match rule {
        Rule::Required { message } => empty.then(|| message.clone()),
        _ if empty => None,
        Rule::Pattern { pattern, message } => {
            let text = value.map(string_form).unwrap_or_default();
            (!pattern.is_match(&text)).then(|| message.clone())
        }
        Rule::Length { min, max, message } => {
            let len = value.and_then(length_of)?;
            let too_short = min.is_some_and(|min| len < min);
            let too_long = max.is_some_and(|max| len > max);
            (too_short || too_long).then(|| message.clone())
        }
        Rule::Custom(validator) => {
            let value = value.cloned().unwrap_or(Value::Null);
            match validator(value).await {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "custom validator rejected; treating as no message");
                    None
                }
            }
        }
    }
}

/// Evaluates `rules` against `value` in the given mode.
///
/// Returns `None` when every rule passes. Messages follow rule order in all
/// modes, including [`ValidateFirst::Parallel`].
pub async fn validate_rules(
    value: Option<&Value>,
    rules: &[Rule],
    mode: ValidateFirst,
) -> Option<Vec<String>> {
    let errors: Vec<String> = match mode {
        ValidateFirst::Parallel => join_all(rules.iter().map(|rule| check_rule(rule, value)))
            .await
            .into_iter()
            .flatten()
            .collect(),
        ValidateFirst::StopAtFirst | ValidateFirst::CollectAll => {
            let mut errors = Vec::new();
            for rule in rules {
                if let Some(message) = check_rule(rule, value).await {
                    trace!(?rule, %message, "rule failed");
                    errors.push(message);
                    if mode == ValidateFirst::StopAtFirst {
                        break;
                    }
                }
            }
            errors
        }
    };

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}
