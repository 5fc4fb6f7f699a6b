//! form-state-util - value utilities shared by the form state crates.

pub mod is_empty;
pub mod json_equal;
pub mod merge;
pub mod omit_nil;

pub use is_empty::{is_empty, is_empty_value};
pub use json_equal::{deep_equal, deep_equal_opt};
pub use merge::deep_merge;
pub use omit_nil::omit_nil;
