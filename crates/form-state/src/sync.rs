//! Cross-field value synchronization.
//!
//! Propagation never re-enters itself: [`SyncCoordinator::on_change`] only
//! returns batches, which the form commits with a deferred notification. By
//! the time that notification is evaluated every cache already holds the
//! propagated value, so nothing propagates further.
//!
//! Caches start empty, so the first evaluation after a sync is added pushes
//! any value already present.

use std::collections::HashMap;

use form_state_path::{self as nav, NamePath};
use form_state_util::deep_equal_opt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::value_tree::FieldUpdate;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncSpec {
    /// `source` is mirrored into every target.
    Star {
        source: NamePath,
        targets: Vec<NamePath>,
    },
    /// Any member's change is mirrored into all others. Per change, only the
    /// first changed member in declaration order wins.
    Group { paths: Vec<NamePath> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncId(u64);

#[derive(Debug)]
enum SyncKind {
    Star {
        source: NamePath,
        targets: Vec<NamePath>,
    },
    Group {
        members: Vec<NamePath>,
    },
}

#[derive(Debug)]
struct SyncEntry {
    kind: SyncKind,
    cache: HashMap<String, Option<Value>>,
}

/// Deduplicates by canonical key, keeping first occurrence order.
fn dedup(paths: impl IntoIterator<Item = NamePath>) -> Vec<NamePath> {
    let mut seen = IndexMap::new();
    for path in paths {
        seen.entry(path.key()).or_insert(path);
    }
    seen.into_values().collect()
}

impl SyncEntry {
    fn new(spec: SyncSpec) -> Self {
        let kind = match spec {
            SyncSpec::Star { source, targets } => {
                let source_key = source.key();
                let targets = dedup(targets)
                    .into_iter()
                    .filter(|t| t.key() != source_key)
                    .collect();
                SyncKind::Star { source, targets }
            }
            SyncSpec::Group { paths } => SyncKind::Group {
                members: dedup(paths),
            },
        };
        SyncEntry {
            kind,
            cache: HashMap::new(),
        }
    }

    fn on_change(&mut self, tree: &Value) -> Option<Vec<FieldUpdate>> {
        match &self.kind {
            SyncKind::Star { source, targets } => {
                let key = source.key();
                let value = nav::get(tree, source).cloned();
                let cached = self.cache.get(&key).and_then(Option::as_ref);
                if deep_equal_opt(value.as_ref(), cached) {
                    return None;
                }
                debug!(%source, targets = targets.len(), "sync source changed");
                let batch = targets
                    .iter()
                    .map(|t| FieldUpdate {
                        path: t.clone(),
                        value: value.clone(),
                        touched: None,
                    })
                    .collect();
                self.cache.insert(key, value);
                Some(batch)
            }
            SyncKind::Group { members } => {
                for leader in members {
                    let key = leader.key();
                    let value = nav::get(tree, leader).cloned();
                    let cached = self.cache.get(&key).and_then(Option::as_ref);
                    if deep_equal_opt(value.as_ref(), cached) {
                        continue;
                    }
                    debug!(%leader, "sync group leader");
                    let batch = members
                        .iter()
                        .filter(|m| m.key() != key)
                        .map(|m| FieldUpdate {
                            path: m.clone(),
                            value: value.clone(),
                            touched: None,
                        })
                        .collect();
                    for member in members {
                        self.cache.insert(member.key(), value.clone());
                    }
                    return Some(batch);
                }
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncCoordinator {
    next_id: u64,
    entries: IndexMap<SyncId, SyncEntry>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        SyncCoordinator::default()
    }

    /// Registers a sync with empty caches.
    pub fn add(&mut self, spec: SyncSpec) -> SyncId {
        let id = SyncId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, SyncEntry::new(spec));
        id
    }

    /// Evaluates a single sync against `tree`.
    pub fn evaluate(&mut self, id: SyncId, tree: &Value) -> Option<Vec<FieldUpdate>> {
        self.entries
            .get_mut(&id)?
            .on_change(tree)
            .filter(|batch| !batch.is_empty())
    }

    pub fn remove(&mut self, id: SyncId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One batch per sync that has something to propagate.
    pub fn on_change(&mut self, tree: &Value) -> Vec<Vec<FieldUpdate>> {
        self.entries
            .values_mut()
            .filter_map(|entry| entry.on_change(tree))
            .filter(|batch| !batch.is_empty())
            .collect()
    }
}
