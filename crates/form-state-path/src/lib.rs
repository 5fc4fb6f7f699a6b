//! Name paths for form state.
//!
//! A [`NamePath`] is an ordered sequence of key and index segments. Every
//! path has a canonical string key (`.users[0].name`) used wherever paths are
//! compared or used as map keys, and can address a location inside a
//! `serde_json::Value` tree.
//!
//! # Example
//!
//! ```
//! use form_state_path::{get, name_path, set, NamePath};
//! use serde_json::json;
//!
//! let path = name_path!["users", 0usize, "name"];
//! assert_eq!(path.key(), ".users[0].name");
//! assert_eq!(NamePath::parse(".users[0].name").unwrap(), path);
//!
//! let mut doc = json!({});
//! set(&mut doc, &path, json!("ada")).unwrap();
//! assert_eq!(get(&doc, &path), Some(&json!("ada")));
//! ```

pub mod codec;
pub mod tree;
pub mod types;

pub use codec::{escape_key, format_key, is_valid_index, parse_key, PathError};
pub use tree::{get, set, unset, MAX_INDEX};
pub use types::{NamePath, PathSegment};
