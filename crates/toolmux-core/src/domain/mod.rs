//! Domain values shared by the storage and gateway crates

pub mod backend;
pub mod config;
pub mod oauth;
pub mod tool;

pub use backend::*;
pub use config::*;
pub use oauth::*;
pub use tool::*;
