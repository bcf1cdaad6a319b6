//! OAuth Authorization Flow
//!
//! Authorization Code flow with PKCE and resource indicators (RFC 8707)
//! for one registered client against one authorization server.

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroizing;

use toolmux_core::{AuthorizationServerMetadata, OAuthRegistration, OAuthToken};

use super::pkce::{generate_state, PkceChallenge};
use super::token::request_token;
use super::OAuthError;

/// Authorization request to be opened in browser
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full authorization URL to open
    pub authorization_url: String,
    /// State parameter for CSRF protection
    pub state: String,
    /// PKCE pair; the verifier is used in the token exchange
    pub pkce: PkceChallenge,
}

/// Query parameters delivered to the loopback redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    /// Parse a raw query string. Unknown parameters are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut callback = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match &*key {
                "code" => &mut callback.code,
                "state" => &mut callback.state,
                "error" => &mut callback.error,
                "error_description" => &mut callback.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        callback
    }

    /// Get error message if present
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match &self.error_description {
            Some(desc) => format!("{}: {}", e, desc),
            None => e.clone(),
        })
    }

    /// Check the redirect against the expected state and extract the code.
    pub fn into_code(self, expected_state: &str) -> Result<String, OAuthError> {
        if let Some(message) = self.error_message() {
            return Err(OAuthError::authorization(message));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(OAuthError::authorization(
                "invalid authorization response: state mismatch",
            ));
        }
        match self.code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(OAuthError::authorization(
                "invalid authorization response: missing code",
            )),
        }
    }
}

/// OAuth flow handler
pub struct OAuthFlow {
    metadata: AuthorizationServerMetadata,
    registration: OAuthRegistration,
}

impl OAuthFlow {
    pub fn new(metadata: AuthorizationServerMetadata, registration: OAuthRegistration) -> Self {
        Self {
            metadata,
            registration,
        }
    }

    pub fn registration(&self) -> &OAuthRegistration {
        &self.registration
    }

    /// Create an authorization request URL
    pub fn create_authorization_request(
        &self,
        scopes: &[String],
        resource: &str,
    ) -> Result<AuthorizationRequest, OAuthError> {
        let state = generate_state();
        let pkce = PkceChallenge::generate();

        let mut url = Url::parse(&self.metadata.authorization_endpoint).map_err(|e| {
            OAuthError::Discovery(format!(
                "invalid authorization_endpoint '{}': {}",
                self.metadata.authorization_endpoint, e
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.registration.client_id);
            query.append_pair("redirect_uri", &self.registration.redirect_uri);
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(" "));
            }
            query.append_pair("state", &state);
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", pkce.method);
            query.append_pair("resource", resource);
        }

        debug!(endpoint = %self.metadata.authorization_endpoint, "[OAuth] Created authorization URL");

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            pkce,
        })
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(
        &self,
        http_client: &reqwest::Client,
        code: &str,
        pkce_verifier: &Zeroizing<String>,
        resource: &str,
    ) -> Result<OAuthToken, OAuthError> {
        info!("[OAuth] Exchanging authorization code for tokens");

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.registration.redirect_uri.as_str()),
            ("client_id", self.registration.client_id.as_str()),
            ("code_verifier", pkce_verifier.as_str()),
            ("resource", resource),
        ];
        if let Some(secret) = &self.registration.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        request_token(http_client, &self.metadata.token_endpoint, &params)
            .await
            .map_err(|e| OAuthError::authorization(format!("code exchange failed: {}", e)))
    }

    /// Refresh an access token.
    ///
    /// A response without a new refresh token keeps the one that was used.
    pub async fn refresh_token(
        &self,
        http_client: &reqwest::Client,
        refresh_token: &str,
        resource: &str,
    ) -> Result<OAuthToken, OAuthError> {
        info!("[OAuth] Refreshing access token");

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.registration.client_id.as_str()),
            ("resource", resource),
        ];
        if let Some(secret) = &self.registration.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let mut token = request_token(http_client, &self.metadata.token_endpoint, &params)
            .await
            .map_err(|e| OAuthError::authorization(format!("refresh failed: {}", e)))?;

        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }
}
