//! Stable cache keys for resource-server URLs

use sha2::{Digest, Sha256};
use url::Url;

use crate::StorageError;

/// SHA-256 hex of the URL's origin followed by its path.
///
/// Query and fragment are ignored, so `https://a/mcp?x=1` and `https://a/mcp`
/// share cached state.
pub fn cache_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.origin().ascii_serialization().as_bytes());
    hasher.update(url.path().as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse `url` and compute its [`cache_key`].
pub fn cache_key_for(url: &str) -> Result<String, StorageError> {
    let parsed = Url::parse(url).map_err(|e| StorageError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(cache_key(&parsed))
}

/// Document name of the cached token for a key.
pub fn token_file(key: &str) -> String {
    format!("{}.token.json", key)
}

/// Document name of the cached client registration for a key.
pub fn registration_file(key: &str) -> String {
    format!("{}.registration.json", key)
}
