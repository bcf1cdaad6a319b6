//! Authorization server discovery
//!
//! Resolves [`AuthorizationServerMetadata`] for a resource server, trying in order:
//!
//! 1. Protected resource metadata (RFC 9728): `HEAD` the resource, read the
//!    `resource_metadata` parameter from `WWW-Authenticate`, follow the
//!    document's authorization server to its well-known metadata.
//! 2. Well-known probes (`oauth-authorization-server`, then
//!    `openid-configuration`) at the resource path and at the origin root.
//! 3. Convention endpoints `{base}/authorize` and `{base}/access_token`.
//!
//! The first strategy that succeeds wins; results are never merged.

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use toolmux_core::AuthorizationServerMetadata;

use super::OAuthError;

const OAUTH_AS_WELL_KNOWN: &str = ".well-known/oauth-authorization-server";
const OPENID_WELL_KNOWN: &str = ".well-known/openid-configuration";

/// Protected resource metadata document (RFC 9728 subset)
#[derive(Debug, Deserialize)]
struct ProtectedResourceMetadata {
    #[serde(default)]
    authorization_server: Option<String>,
    #[serde(default)]
    authorization_servers: Vec<String>,
}

/// Discovery client
#[derive(Clone)]
pub struct OAuthDiscovery {
    http_client: reqwest::Client,
}

impl OAuthDiscovery {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Discover the authorization server for `resource`.
    ///
    /// Only a resource URL without a usable origin fails; network or parse
    /// errors in the probes fall through to the next strategy.
    pub async fn discover(&self, resource: &Url) -> Result<AuthorizationServerMetadata, OAuthError> {
        let base = resource_base(resource)?;

        match self.from_protected_resource(resource).await {
            Ok(metadata) => {
                info!(resource = %resource, "[OAuth] Discovered authorization server via protected resource metadata");
                return Ok(metadata);
            }
            Err(reason) => {
                debug!(resource = %resource, reason = %reason, "[OAuth] Protected resource metadata unavailable");
            }
        }

        for candidate in well_known_candidates(resource) {
            match self.fetch_metadata(&candidate).await {
                Ok(metadata) => {
                    info!(resource = %resource, metadata_url = %candidate, "[OAuth] Discovered authorization server metadata");
                    return Ok(metadata);
                }
                Err(reason) => {
                    debug!(metadata_url = %candidate, reason = %reason, "[OAuth] Well-known probe failed");
                }
            }
        }

        warn!(
            resource = %resource,
            "[OAuth] No authorization server metadata found, using convention endpoints"
        );
        Ok(fallback_metadata(&base))
    }

    async fn from_protected_resource(
        &self,
        resource: &Url,
    ) -> Result<AuthorizationServerMetadata, String> {
        let response = self
            .http_client
            .head(resource.as_str())
            .send()
            .await
            .map_err(|e| format!("HEAD request failed: {}", e))?;

        let challenge = response
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| "no WWW-Authenticate header".to_string())?;
        let metadata_ref = parse_resource_metadata(challenge)
            .ok_or_else(|| "WWW-Authenticate has no resource_metadata parameter".to_string())?;
        let metadata_url = resource
            .join(&metadata_ref)
            .map_err(|e| format!("invalid resource_metadata URL '{}': {}", metadata_ref, e))?;

        debug!(metadata_url = %metadata_url, "[OAuth] Fetching protected resource metadata");
        let response = self
            .http_client
            .get(metadata_url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("resource metadata request failed: {}", e))?;
        if !response.status().is_success() {
            return Err(format!("resource metadata returned HTTP {}", response.status()));
        }
        let document: ProtectedResourceMetadata = response
            .json()
            .await
            .map_err(|e| format!("invalid resource metadata: {}", e))?;

        let issuer = document
            .authorization_server
            .or_else(|| document.authorization_servers.into_iter().next())
            .ok_or_else(|| "resource metadata names no authorization server".to_string())?;

        let mut last_error = format!("no metadata found for authorization server {}", issuer);
        for candidate in authorization_server_candidates(&issuer) {
            match self.fetch_metadata(&candidate).await {
                Ok(metadata) => return Ok(metadata),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    async fn fetch_metadata(&self, url: &str) -> Result<AuthorizationServerMetadata, String> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response
            .json::<AuthorizationServerMetadata>()
            .await
            .map_err(|e| format!("invalid metadata document: {}", e))
    }
}

/// Origin plus path (no trailing slash), e.g. `https://api.example.com/mcp`.
fn resource_base(resource: &Url) -> Result<String, OAuthError> {
    let origin = resource.origin();
    if !origin.is_tuple() {
        return Err(OAuthError::Discovery(format!(
            "resource URL '{}' has no origin",
            resource
        )));
    }
    Ok(format!(
        "{}{}",
        origin.ascii_serialization(),
        resource.path().trim_end_matches('/')
    ))
}

/// Well-known probe URLs: resource path first, then origin root.
fn well_known_candidates(resource: &Url) -> Vec<String> {
    let origin = resource.origin().ascii_serialization();
    let path = resource.path().trim_end_matches('/');

    let mut candidates = Vec::with_capacity(4);
    for base in [format!("{}{}", origin, path), origin] {
        for suffix in [OAUTH_AS_WELL_KNOWN, OPENID_WELL_KNOWN] {
            let candidate = format!("{}/{}", base, suffix);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Metadata URLs for an issuer named by protected resource metadata.
fn authorization_server_candidates(issuer: &str) -> Vec<String> {
    let issuer = issuer.trim_end_matches('/');
    let mut candidates = vec![
        format!("{}/{}", issuer, OAUTH_AS_WELL_KNOWN),
        format!("{}/{}", issuer, OPENID_WELL_KNOWN),
    ];

    // RFC 8414 inserts the well-known segment between host and path
    if let Ok(url) = Url::parse(issuer) {
        let path = url.path().trim_end_matches('/');
        if !path.is_empty() {
            candidates.push(format!(
                "{}/{}{}",
                url.origin().ascii_serialization(),
                OAUTH_AS_WELL_KNOWN,
                path
            ));
        }
    }
    candidates
}

fn fallback_metadata(base: &str) -> AuthorizationServerMetadata {
    AuthorizationServerMetadata {
        authorization_endpoint: format!("{}/authorize", base),
        token_endpoint: format!("{}/access_token", base),
        registration_endpoint: None,
        issuer: None,
        scopes_supported: None,
        code_challenge_methods_supported: None,
    }
}

/// Extract the `resource_metadata` parameter from a `WWW-Authenticate` value.
pub fn parse_resource_metadata(header: &str) -> Option<String> {
    const PARAM: &str = "resource_metadata";
    let lower = header.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(pos) = lower[search_from..].find(PARAM) {
        let start = search_from + pos;
        search_from = start + PARAM.len();

        let at_boundary = start == 0 || matches!(header.as_bytes()[start - 1], b' ' | b',' | b'\t');
        if !at_boundary {
            continue;
        }
        let Some(value) = header[search_from..].trim_start().strip_prefix('=') else {
            continue;
        };

        let value = value.trim_start();
        let parsed = match value.strip_prefix('"') {
            Some(quoted) => quoted.split('"').next(),
            None => value.split([',', ' ']).next(),
        };
        if let Some(parsed) = parsed.filter(|v| !v.is_empty()) {
            return Some(parsed.to_string());
        }
    }
    None
}
