//! Dynamic Client Registration (RFC 7591)
//!
//! Registers ToolMux as a public client with an authorization server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use toolmux_core::OAuthRegistration;

use super::OAuthError;

/// Dynamic Client Registration Request (RFC 7591)
#[derive(Debug, Clone, Serialize)]
pub struct DcrRequest {
    /// Human-readable name of the client
    pub client_name: String,
    /// Array of allowed redirect URIs
    pub redirect_uris: Vec<String>,
    /// OAuth 2.0 grant types the client may use
    pub grant_types: Vec<String>,
    /// OAuth 2.0 response types the client may use
    pub response_types: Vec<String>,
    /// Authentication method for the token endpoint
    pub token_endpoint_auth_method: String,
    /// Space-separated scopes the client may request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl DcrRequest {
    /// Public-client registration for the authorization code + refresh grants.
    pub fn public_client(client_name: &str, redirect_uri: &str, scopes: &[String]) -> Self {
        Self {
            client_name: client_name.to_string(),
            redirect_uris: vec![redirect_uri.to_string()],
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
            scope: (!scopes.is_empty()).then(|| scopes.join(" ")),
        }
    }
}

/// Dynamic Client Registration Response (RFC 7591)
#[derive(Debug, Clone, Deserialize)]
pub struct DcrResponse {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Seconds since the epoch; 0 means the secret never expires
    #[serde(default)]
    pub client_secret_expires_at: Option<i64>,
}

impl DcrResponse {
    fn into_registration(self, redirect_uri: &str) -> OAuthRegistration {
        let expires_at = self
            .client_secret_expires_at
            .filter(|secs| *secs > 0)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        OAuthRegistration {
            client_id: self.client_id,
            client_secret: self.client_secret,
            expires_at,
            redirect_uri: redirect_uri.to_string(),
        }
    }
}

/// POST a registration request.
///
/// A missing `registration_endpoint` is a hard failure: there is no
/// pre-provisioned client to fall back to.
pub async fn register_client(
    http_client: &reqwest::Client,
    registration_endpoint: Option<&str>,
    request: &DcrRequest,
) -> Result<OAuthRegistration, OAuthError> {
    let endpoint = registration_endpoint.ok_or_else(|| {
        OAuthError::Registration(
            "authorization server does not support dynamic client registration".to_string(),
        )
    })?;
    let redirect_uri = request
        .redirect_uris
        .first()
        .cloned()
        .ok_or_else(|| OAuthError::Registration("no redirect URI to register".to_string()))?;

    info!(endpoint = %endpoint, redirect_uri = %redirect_uri, "[OAuth] Registering client");

    let response = http_client
        .post(endpoint)
        .header("Accept", "application/json")
        .json(request)
        .send()
        .await
        .map_err(|e| OAuthError::Registration(format!("registration request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(endpoint = %endpoint, status = %status, "[OAuth] Client registration rejected");
        return Err(OAuthError::Registration(format!(
            "registration endpoint returned HTTP {} - {}",
            status, body
        )));
    }

    let registration: DcrResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::Registration(format!("invalid registration response: {}", e)))?;

    info!(client_id = %registration.client_id, "[OAuth] Client registered");
    Ok(registration.into_registration(&redirect_uri))
}
