//! Canonical key codec.
//!
//! A path is encoded as the concatenation of `.key` and `[index]` tokens.
//! Inside a key, `\`, `.`, `[` and `]` are escaped with a leading `\` so the
//! encoding stays injective.

use thiserror::Error;

use crate::types::{NamePath, PathSegment};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unterminated index at offset {0}")]
    UnterminatedIndex(usize),
    #[error("invalid index {0:?}")]
    InvalidIndex(String),
    #[error("dangling escape at end of key")]
    DanglingEscape,
    #[error("key {key:?} cannot address an array")]
    KeyOnArray { key: String },
    #[error("index {0} exceeds the array index limit")]
    IndexTooLarge(usize),
}

fn needs_escape(c: char) -> bool {
    matches!(c, '\\' | '.' | '[' | ']')
}

/// Escapes a key segment for use in a canonical key.
///
/// ```
/// use form_state_path::escape_key;
///
/// assert_eq!(escape_key("plain"), "plain");
/// assert_eq!(escape_key("a.b"), "a\\.b");
/// assert_eq!(escape_key("x[0]"), "x\\[0\\]");
/// ```
pub fn escape_key(key: &str) -> String {
    if !key.chars().any(needs_escape) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 2);
    for c in key.chars() {
        if needs_escape(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Formats segments into their canonical key.
pub fn format_key(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(key) => {
                out.push('.');
                out.push_str(&escape_key(key));
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Parses a canonical key back into a [`NamePath`].
///
/// The empty string is the root path.
///
/// # Errors
///
/// Returns [`PathError`] when the key is not a concatenation of `.key` and
/// `[index]` tokens.
pub fn parse_key(input: &str) -> Result<NamePath, PathError> {
    let mut segments = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&(pos, next)) = chars.peek() {
                    match next {
                        '.' | '[' => break,
                        ']' => {
                            return Err(PathError::UnexpectedChar {
                                found: next,
                                offset: pos,
                            })
                        }
                        '\\' => {
                            chars.next();
                            match chars.next() {
                                Some((_, escaped)) => key.push(escaped),
                                None => return Err(PathError::DanglingEscape),
                            }
                        }
                        _ => {
                            key.push(next);
                            chars.next();
                        }
                    }
                }
                segments.push(PathSegment::Key(key));
            }
            '[' => {
                let mut digits = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(next);
                }
                if !closed {
                    return Err(PathError::UnterminatedIndex(offset));
                }
                if !is_valid_index(&digits) {
                    return Err(PathError::InvalidIndex(digits));
                }
                let idx = digits
                    .parse()
                    .map_err(|_| PathError::InvalidIndex(digits.clone()))?;
                segments.push(PathSegment::Index(idx));
            }
            found => return Err(PathError::UnexpectedChar { found, offset }),
        }
    }

    Ok(NamePath::new(segments))
}

/// Check if a string is a valid non-negative integer index.
///
/// Leading zeros are rejected so every index has exactly one spelling.
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_digit())
}

impl NamePath {
    /// Parses a canonical key. See [`parse_key`].
    pub fn parse(input: &str) -> Result<Self, PathError> {
        parse_key(input)
    }
}

impl std::str::FromStr for NamePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_path;

    #[test]
    fn test_format_key() {
        assert_eq!(format_key(&[]), "");
        assert_eq!(name_path!["a"].key(), ".a");
        assert_eq!(name_path!["a", "b"].key(), ".a.b");
        assert_eq!(name_path!["list", 0usize, "x"].key(), ".list[0].x");
        assert_eq!(name_path![2usize].key(), "[2]");
    }

    #[test]
    fn test_key_vs_index_distinct() {
        // "0" as a key and 0 as an index are different fields
        assert_ne!(name_path!["0"].key(), name_path![0usize].key());
    }

    #[test]
    fn test_escaped_keys_are_injective() {
        let dotted = name_path!["a.b"];
        let nested = name_path!["a", "b"];
        assert_ne!(dotted.key(), nested.key());
        assert_eq!(dotted.key(), ".a\\.b");
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("").unwrap(), NamePath::root());
        assert_eq!(
            parse_key(".users[10].name").unwrap(),
            name_path!["users", 10usize, "name"]
        );
        assert_eq!(parse_key(".a\\.b").unwrap(), name_path!["a.b"]);
        assert_eq!(parse_key(".").unwrap(), name_path![""]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_key("a"),
            Err(PathError::UnexpectedChar { found: 'a', offset: 0 })
        );
        assert_eq!(parse_key(".a[1"), Err(PathError::UnterminatedIndex(2)));
        assert_eq!(
            parse_key("[01]"),
            Err(PathError::InvalidIndex("01".to_string()))
        );
        assert_eq!(
            parse_key("[-1]"),
            Err(PathError::InvalidIndex("-1".to_string()))
        );
        assert_eq!(parse_key(".a\\"), Err(PathError::DanglingEscape));
        assert!(matches!(
            parse_key(".a]"),
            Err(PathError::UnexpectedChar { found: ']', .. })
        ));
    }

    #[test]
    fn test_is_valid_index() {
        assert!(is_valid_index("0"));
        assert!(is_valid_index("123"));
        assert!(!is_valid_index("-1"));
        assert!(!is_valid_index("1.5"));
        assert!(!is_valid_index(""));
        assert!(!is_valid_index("01"));
    }

    #[test]
    fn test_roundtrip() {
        let keys = ["", ".a", ".a.b", "[0]", ".a[0][1].b", ".x\\[y\\]", ".\\\\"];
        for key in keys {
            let path = parse_key(key).unwrap();
            assert_eq!(path.key(), key, "Failed roundtrip for: {:?}", key);
        }
    }
}
