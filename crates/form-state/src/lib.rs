//! Form state engine.
//!
//! A [`Form`] keeps a registry of fields addressed by nested paths, one
//! nested value tree holding their values, and the machinery around them:
//! rule validation, revalidation when a dependency changes, value sync
//! between fields, and submission.
//!
//! The engine is single threaded. Bindings ([`FieldItem`], [`KeepAlive`], or
//! anything implementing [`Binding`]) register themselves for a path and
//! are asked to validate and transform on demand.
//!
//! # Example
//!
//! ```
//! use form_state::{FieldItem, FieldItemProps, Form};
//! use futures::executor::block_on;
//! use serde_json::json;
//!
//! let form = Form::default();
//! let name = FieldItem::mount(&form, FieldItemProps::new("name").label("Name").required(true));
//!
//! assert_eq!(block_on(form.submit()).unwrap(), None);
//! assert_eq!(form.get_field_error(name.path()), vec!["Name is required".to_string()]);
//!
//! block_on(name.change(json!("Ada")));
//! assert_eq!(block_on(form.submit()).unwrap(), Some(json!({"name": "Ada"})));
//! ```

pub mod binding;
pub mod config;
pub mod dependency;
pub mod error;
pub mod events;
pub mod form;
pub mod item;
pub mod registry;
pub mod rules;
mod submission;
pub mod sync;
pub mod value_tree;

pub use binding::{Binding, TransformResult};
pub use config::{FormConfig, ItemConfig, Layout, ResolvedItemConfig, TransformBehavior, ValidateFirst};
pub use error::{ConfigError, FormError, RuleError, TransformError};
pub use events::{FieldValue, FormEvent, SubscriptionId};
pub use form::{Form, FormOptions};
pub use item::{FieldItem, FieldItemProps, FieldState, KeepAlive};
pub use registry::{FieldErrors, FieldSnapshot};
pub use rules::{validate_rules, Rule};
pub use sync::{SyncId, SyncSpec};
pub use value_tree::FieldUpdate;

pub use form_state_path::{name_path, NamePath, PathSegment};
