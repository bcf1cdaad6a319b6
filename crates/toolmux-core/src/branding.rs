//! Centralized branding constants
//!
//! All product naming comes from this module.
//! Generated from branding.toml at build time.
//!
//! # Usage
//!
//! ```rust
//! use toolmux_core::branding;
//!
//! println!("App: {}", branding::DISPLAY_NAME);
//! let uri = branding::oauth_callback_uri_with_port(9876);
//! assert_eq!(uri, "http://127.0.0.1:9876/");
//! ```

use std::path::PathBuf;

// Include generated constants from build.rs
include!(concat!(env!("OUT_DIR"), "/branding_generated.rs"));

/// Root directory for everything the app persists.
///
/// Falls back to the current directory when the platform has no data dir.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

/// Directory holding cached OAuth tokens and client registrations.
pub fn oauth_cache_dir() -> PathBuf {
    data_dir().join("oauth")
}

/// Directory for rolling log files.
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Client name sent during Dynamic Client Registration and shown on consent screens.
pub fn oauth_client_name() -> &'static str {
    DISPLAY_NAME
}

/// Build the loopback redirect URI for a listener port.
///
/// Uses 127.0.0.1 rather than `localhost` (RFC 8252 section 7.3).
pub fn oauth_callback_uri_with_port(port: u16) -> String {
    format!("http://127.0.0.1:{}/", port)
}

/// Client name announced to backends during the MCP handshake.
pub fn mcp_client_name(backend: &str) -> String {
    format!("{}-{}", LOG_PREFIX, backend)
}
