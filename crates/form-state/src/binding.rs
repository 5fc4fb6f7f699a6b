//! The capability a UI element exposes to the engine.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransformError;

/// Output of [`Binding::transform`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub value: Value,
    /// Deep-merge `value` at the submission root instead of assigning it at
    /// the field's path.
    pub merge_into_root: bool,
}

/// A handle registered for a field.
///
/// A field may hold several bindings at once. Every binding's `validate`
/// contributes to the field's errors; only the most recently registered
/// binding's `transform` is used on submission.
#[async_trait(?Send)]
pub trait Binding {
    /// Validates the field's current value, or `override_value` when given.
    /// Returns `None` when valid.
    async fn validate(&self, override_value: Option<Value>) -> Option<Vec<String>>;

    /// `Ok(None)` means "submit the raw stored value".
    async fn transform(&self) -> Result<Option<TransformResult>, TransformError> {
        Ok(None)
    }
}
