//! # ToolMux Core Library
//!
//! Domain types for the ToolMux tool orchestrator.
//!
//! ## Modules
//!
//! - `branding` - Product naming and default directories (generated from branding.toml)
//! - `domain` - Backend configuration, namespaced tool names, OAuth cache documents
//! - `error` - Error types for the above

pub mod branding;
pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{ConfigError, ToolNameError, ToolNotFoundError};
