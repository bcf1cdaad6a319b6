//! ToolMux Storage Layer
//!
//! A small file-backed key to JSON-document store used for OAuth state.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//!   <sha256(origin + path)>.token.json          cached OAuthToken
//!   <sha256(origin + path)>.registration.json   cached OAuthRegistration
//! ```
//!
//! Files are written atomically (temp file + rename) with owner-only permissions
//! because they hold bearer tokens and client secrets.
//!
//! # Usage
//!
//! ```rust,ignore
//! use toolmux_storage::{cache_key, TrustStore, token_file};
//!
//! let store = TrustStore::new(toolmux_core::branding::oauth_cache_dir());
//! let key = cache_key(&url::Url::parse("https://api.example.com/mcp")?);
//! let token: Option<OAuthToken> = store.read(&token_file(&key)).await;
//! ```

mod cache_key;
mod error;
mod trust_store;

pub use cache_key::{cache_key, cache_key_for, registration_file, token_file};
pub use error::StorageError;
pub use trust_store::TrustStore;
