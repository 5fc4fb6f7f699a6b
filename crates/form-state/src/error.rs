//! Error types for the form engine.
//!
//! Misuse of the registry (unknown paths, duplicate registration) is never an
//! error: it is logged and degrades to a no-op. Validation failures are data.
//! What remains are rejected async work and bad configuration.

use form_state_path::NamePath;
use thiserror::Error;

/// A custom validator rejected instead of resolving to a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("validator rejected: {0}")]
    Rejected(String),
}

/// A binding's transform rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid form configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("transform failed for field {path}: {source}")]
    Transform {
        path: NamePath,
        #[source]
        source: TransformError,
    },
}
