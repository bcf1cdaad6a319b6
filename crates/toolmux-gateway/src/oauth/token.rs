//! Token endpoint requests and responses

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use toolmux_core::{OAuthToken, DEFAULT_TOKEN_LIFETIME_SECS};

/// Token response from the authorization server
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for OAuthToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            expires_in: response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            refresh_token: response.refresh_token,
            obtained_at: Utc::now(),
            token_type: response.token_type,
            scope: response.scope,
        }
    }
}

/// POST a form-encoded grant to the token endpoint.
///
/// Errors are returned as display strings; callers decide whether the
/// failure is fatal (code exchange) or recoverable (refresh).
pub(crate) async fn request_token(
    http_client: &reqwest::Client,
    token_endpoint: &str,
    params: &[(&str, &str)],
) -> Result<OAuthToken, String> {
    let grant_type = params
        .iter()
        .find(|(k, _)| *k == "grant_type")
        .map(|(_, v)| *v)
        .unwrap_or("unknown");
    debug!(grant_type, endpoint = %token_endpoint, "[OAuth] Requesting token");

    let response = http_client
        .post(token_endpoint)
        .header("Accept", "application/json")
        .form(params)
        .send()
        .await
        .map_err(|e| format!("token request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("token endpoint returned HTTP {} - {}", status, body));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| format!("invalid token response: {}", e))?;
    if token.access_token.is_empty() {
        return Err("token response has an empty access_token".to_string());
    }

    Ok(token.into())
}
