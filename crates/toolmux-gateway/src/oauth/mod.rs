//! OAuth 2.1 client for remote backends
//!
//! Obtains bearer tokens for resource servers without pre-provisioned
//! credentials: cached token, then refresh, then an interactive PKCE flow with
//! authorization server discovery and Dynamic Client Registration.

mod browser;
mod callback;
mod client;
mod dcr;
mod discovery;
mod error;
mod flow;
mod pkce;
mod token;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use callback::LoopbackListener;
pub use client::OAuthClient;
pub use dcr::{register_client, DcrRequest, DcrResponse};
pub use discovery::{parse_resource_metadata, OAuthDiscovery};
pub use error::OAuthError;
pub use flow::{AuthorizationCallback, AuthorizationRequest, OAuthFlow};
pub use pkce::{generate_state, PkceChallenge};
pub use token::TokenResponse;

use std::time::Duration;

use toolmux_core::branding;

/// Default time the user has to finish the browser step
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for each OAuth HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client configuration
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Name sent during client registration
    pub client_name: String,
    /// Scopes to request; empty means the server's `scopes_supported`
    pub scopes: Vec<String>,
    /// Bound on the loopback wait
    pub callback_timeout: Duration,
    /// Bound on each discovery/registration/token request
    pub request_timeout: Duration,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_name: branding::oauth_client_name().to_string(),
            scopes: Vec::new(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OAuthSettings {
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }
}
