//! Type definitions for name paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::format_key;

/// A single step in a [`NamePath`].
///
/// Keys address mapping entries, indices address sequence elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(idx) => Some(*idx),
            PathSegment::Key(_) => None,
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

/// An ordered sequence of segments addressing a location in a value tree.
///
/// Two paths name the same field iff their canonical keys are equal, which
/// for this encoding is the same as structural equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamePath(Vec<PathSegment>);

impl NamePath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        NamePath(segments)
    }

    /// The empty path, addressing the root.
    pub fn root() -> Self {
        NamePath(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical string key, e.g. `.users[0].name`.
    pub fn key(&self) -> String {
        format_key(&self.0)
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        NamePath(segments)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathSegment> {
        self.0.iter()
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<Vec<PathSegment>> for NamePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        NamePath(segments)
    }
}

impl From<&str> for NamePath {
    /// A single-key path. Use [`NamePath::parse`] for canonical keys.
    fn from(key: &str) -> Self {
        NamePath(vec![PathSegment::from(key)])
    }
}

impl<'a> IntoIterator for &'a NamePath {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<PathSegment> for NamePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        NamePath(iter.into_iter().collect())
    }
}

/// Builds a [`NamePath`] from a mix of key and index literals.
///
/// ```
/// use form_state_path::name_path;
///
/// let path = name_path!["users", 0usize, "email"];
/// assert_eq!(path.key(), ".users[0].email");
/// ```
#[macro_export]
macro_rules! name_path {
    () => {
        $crate::NamePath::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::NamePath::new(vec![$($crate::PathSegment::from($segment)),+])
    };
}
