//! Error types for the core domain

use std::path::PathBuf;

use thiserror::Error;

/// A namespaced tool name could not be built or parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolNameError {
    #[error("'{name}' must contain the '::' delimiter exactly once (found {found})")]
    DelimiterCount { name: String, found: usize },

    #[error("'{name}' has an empty backend or tool part")]
    EmptyPart { name: String },

    #[error("{kind} name '{value}' must not contain '::'")]
    ContainsDelimiter { kind: &'static str, value: String },

    #[error("{kind} name '{value}' would put a ':' next to the '::' delimiter")]
    AdjacentColon { kind: &'static str, value: String },
}

/// A backend configuration document or entry is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("backend '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },
}

/// Returned by tool routing when a namespaced name does not resolve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Tool not found: {name} ({reason})")]
pub struct ToolNotFoundError {
    pub name: String,
    pub reason: String,
}

impl ToolNotFoundError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
