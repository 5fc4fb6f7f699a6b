//! Dependency-triggered revalidation.
//!
//! A field may watch other paths. When any watched value changes, the field
//! is revalidated, but only once it has been touched, so untouched fields
//! never surface errors the user has not provoked.

use form_state_path::{self as nav, NamePath};
use form_state_util::deep_equal_opt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

#[derive(Debug)]
struct DependencyWatch {
    field: NamePath,
    dependencies: Vec<NamePath>,
    last: Vec<Option<Value>>,
}

fn read_all(tree: &Value, paths: &[NamePath]) -> Vec<Option<Value>> {
    paths.iter().map(|p| nav::get(tree, p).cloned()).collect()
}

#[derive(Debug, Default)]
pub struct DependencyNotifier {
    watches: IndexMap<String, DependencyWatch>,
}

impl DependencyNotifier {
    pub fn new() -> Self {
        DependencyNotifier::default()
    }

    /// Declares `dependencies` for `field`, replacing an earlier declaration.
    /// The current values become the baseline.
    pub fn watch(&mut self, field: &NamePath, dependencies: Vec<NamePath>, tree: &Value) {
        let last = read_all(tree, &dependencies);
        self.watches.insert(
            field.key(),
            DependencyWatch {
                field: field.clone(),
                dependencies,
                last,
            },
        );
    }

    pub fn unwatch(&mut self, field: &NamePath) -> bool {
        self.watches.shift_remove(&field.key()).is_some()
    }

    pub fn is_watching(&self, field: &NamePath) -> bool {
        self.watches.contains_key(&field.key())
    }

    /// Recomputes every watch against `tree` and returns the fields to
    /// revalidate.
    pub fn on_change(
        &mut self,
        tree: &Value,
        is_touched: impl Fn(&NamePath) -> bool,
    ) -> Vec<NamePath> {
        let mut triggered = Vec::new();
        for watch in self.watches.values_mut() {
            let current = read_all(tree, &watch.dependencies);
            let changed = current
                .iter()
                .zip(&watch.last)
                .any(|(now, before)| !deep_equal_opt(now.as_ref(), before.as_ref()));
            if !changed {
                continue;
            }
            watch.last = current;
            if is_touched(&watch.field) {
                trace!(field = %watch.field, "dependency changed; revalidating");
                triggered.push(watch.field.clone());
            }
        }
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_state_path::name_path;
    use serde_json::json;

    #[test]
    fn triggers_only_when_touched() {
        let mut notifier = DependencyNotifier::new();
        let confirm = name_path!["confirm"];
        notifier.watch(&confirm, vec![name_path!["password"]], &json!({}));

        let tree = json!({"password": "a"});
        assert!(notifier.on_change(&tree, |_| false).is_empty());

        // baseline moved on even though nothing fired
        assert!(notifier.on_change(&tree, |_| true).is_empty());

        let tree = json!({"password": "ab"});
        assert_eq!(notifier.on_change(&tree, |_| true), vec![confirm]);
    }

    #[test]
    fn any_position_counts() {
        let mut notifier = DependencyNotifier::new();
        let field = name_path!["total"];
        let tree = json!({"a": 1, "b": 2});
        notifier.watch(&field, vec![name_path!["a"], name_path!["b"]], &tree);

        assert!(notifier.on_change(&tree, |_| true).is_empty());
        let tree = json!({"a": 1, "b": 3});
        assert_eq!(notifier.on_change(&tree, |_| true), vec![field.clone()]);
        let tree = json!({"a": 1});
        assert_eq!(notifier.on_change(&tree, |_| true), vec![field]);
    }

    #[test]
    fn unwatch_stops_triggers() {
        let mut notifier = DependencyNotifier::new();
        let field = name_path!["x"];
        notifier.watch(&field, vec![name_path!["y"]], &json!({}));
        assert!(notifier.unwatch(&field));
        assert!(!notifier.is_watching(&field));
        assert!(notifier.on_change(&json!({"y": 1}), |_| true).is_empty());
    }
}
