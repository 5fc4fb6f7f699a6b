//! Submission and reset.

use form_state_path::{self as nav, NamePath};
use form_state_util::{deep_merge, omit_nil};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::binding::TransformResult;
use crate::error::FormError;
use crate::form::Form;
use crate::value_tree::FieldUpdate;

fn assign(out: &mut Value, path: &NamePath, value: Value) {
    if let Err(err) = nav::set(out, path, value) {
        warn!(field = %path, error = %err, "value left out of the payload");
    }
}

impl Form {
    /// Assembles the submission payload for the targeted fields (all when
    /// `None`), in registration order.
    ///
    /// Each field contributes its raw value unless its most recently
    /// registered binding yields a transform result, which is either assigned
    /// at the field's path or deep-merged at the root. Fields with a missing
    /// binding are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Transform`] when a transform rejects.
    pub async fn get_fields_formatted_value(
        &self,
        paths: Option<&[NamePath]>,
    ) -> Result<Value, FormError> {
        let targets = self.resolve_targets(paths, "format");
        let mut out = Value::Object(Map::new());

        for path in targets {
            let (binding, raw) = {
                let state = self.inner.state.borrow();
                let Some(field) = state.registry.get(&path) else {
                    continue;
                };
                if field.live_bindings().is_none() {
                    warn!(field = %path, "skipping a field with a missing binding");
                    continue;
                }
                (field.authoritative_binding(), state.tree.get(&path).cloned())
            };

            let transformed = match binding {
                Some(binding) => binding
                    .transform()
                    .await
                    .map_err(|source| FormError::Transform {
                        path: path.clone(),
                        source,
                    })?,
                None => None,
            };

            match transformed {
                Some(TransformResult {
                    value: value @ Value::Object(_),
                    merge_into_root: true,
                }) => deep_merge(&mut out, value),
                Some(TransformResult {
                    merge_into_root: true,
                    ..
                }) => {
                    warn!(field = %path, "transform result is not an object; nothing to merge");
                }
                Some(TransformResult { value, .. }) => assign(&mut out, &path, value),
                None => {
                    if let Some(raw) = raw {
                        assign(&mut out, &path, raw);
                    }
                }
            }
        }

        if self.config().omit_nil {
            omit_nil(&mut out);
        }
        Ok(out)
    }

    /// Validates every field, then assembles and reports the payload.
    ///
    /// A failed validation invokes `on_finish_failed` and yields `Ok(None)`.
    /// Otherwise `on_finish` receives the payload, which is also returned.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Transform`] when a transform rejects. Neither
    /// callback is invoked in that case.
    pub async fn submit(&self) -> Result<Option<Value>, FormError> {
        if let Some(failed) = self.validate_fields(None).await {
            debug!(failed = failed.len(), "submission blocked by validation");
            if let Some(on_finish_failed) = &self.inner.on_finish_failed {
                on_finish_failed(&failed);
            }
            return Ok(None);
        }

        let values = self.get_fields_formatted_value(None).await?;
        debug!("form submitted");
        if let Some(on_finish) = &self.inner.on_finish {
            on_finish(&values);
        }
        Ok(Some(values))
    }

    /// Restores the targeted fields (all when `None`) to their initial
    /// values as one batch and clears their touched flags.
    ///
    /// A field's own initial value wins over the form-level one; with
    /// neither, the value is unset. Errors are kept unless
    /// `reset_clears_errors` is configured.
    pub fn reset_fields(&self, paths: Option<&[NamePath]>) {
        let targets = self.resolve_targets(paths, "reset");
        let clear_errors = self.config().reset_clears_errors;
        let mut state = self.inner.state.borrow_mut();
        let updates: Vec<FieldUpdate> = targets
            .into_iter()
            .filter_map(|path| {
                let field = state.registry.get(&path)?;
                let value = field
                    .initial_value
                    .clone()
                    .or_else(|| self.initial_value(&path));
                Some(FieldUpdate::new(path, value).touched(false))
            })
            .collect();
        if updates.is_empty() {
            return;
        }
        if clear_errors {
            for update in &updates {
                state.registry.set_errors(&update.path, Vec::new());
            }
        }
        debug!(count = updates.len(), "fields reset");
        state.commit(&updates);
    }

    pub fn reset(&self) {
        self.reset_fields(None);
    }
}
