//! Autonomous OAuth client
//!
//! One [`OAuthClient`] is constructed by the host and shared by every backend
//! connection. Each `get_valid_access_token` call runs these steps in order,
//! stopping at the first that yields a token:
//!
//! 1. bind the loopback listener (reusing a cached registration's port when possible)
//! 2. return an unexpired cached token
//! 3. discover the authorization server
//! 4. reuse or create a client registration
//! 5. try the cached refresh token once
//! 6. run the interactive PKCE grant
//!
//! The listener is closed on every exit path.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use toolmux_core::{AuthorizationServerMetadata, OAuthRegistration, OAuthToken};
use toolmux_storage::{cache_key, registration_file, token_file, TrustStore};

use super::browser::{BrowserLauncher, SystemBrowser};
use super::callback::LoopbackListener;
use super::dcr::{register_client, DcrRequest};
use super::discovery::OAuthDiscovery;
use super::flow::OAuthFlow;
use super::{OAuthError, OAuthSettings};

pub struct OAuthClient {
    store: Arc<TrustStore>,
    http_client: reqwest::Client,
    discovery: OAuthDiscovery,
    browser: Arc<dyn BrowserLauncher>,
    settings: OAuthSettings,
    /// Serializes concurrent calls for the same resource key
    flow_locks: DashMap<String, Arc<Mutex<()>>>,
    shutdown: CancellationToken,
}

impl OAuthClient {
    pub fn new(store: Arc<TrustStore>, settings: OAuthSettings) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "[OAuth] Failed to build HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            store,
            discovery: OAuthDiscovery::new(http_client.clone()),
            http_client,
            browser: Arc::new(SystemBrowser),
            settings,
            flow_locks: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the browser launcher (headless hosts, tests)
    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.discovery = OAuthDiscovery::new(http_client.clone());
        self.http_client = http_client;
        self
    }

    pub fn store(&self) -> &TrustStore {
        &self.store
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Abort every pending and future loopback wait on this client.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Return a bearer token for `resource_url`, authorizing if needed.
    pub async fn get_valid_access_token(&self, resource_url: &str) -> Result<String, OAuthError> {
        let resource = Url::parse(resource_url).map_err(|e| OAuthError::InvalidResource {
            url: resource_url.to_string(),
            reason: e.to_string(),
        })?;
        let key = cache_key(&resource);

        let _flow = self.lock_flow(&key).await;

        let cached_registration: Option<OAuthRegistration> =
            self.store.read(&registration_file(&key)).await;
        let (mut listener, registration) = self.acquire_listener(&key, cached_registration).await?;

        let result = self
            .authorize(resource_url, &resource, &key, &mut listener, registration)
            .await;
        listener.close().await;

        match &result {
            Ok(_) => debug!(resource = %resource_url, "[OAuth] Access token ready"),
            Err(e) => warn!(resource = %resource_url, error = %e, "[OAuth] Could not obtain access token"),
        }
        result
    }

    async fn lock_flow(&self, key: &str) -> FlowLock<'_> {
        let lock = self.flow_locks.entry(key.to_string()).or_default().value().clone();
        let guard = lock.lock_owned().await;
        FlowLock {
            locks: &self.flow_locks,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Step 1: bind the cached registration's port, or a fresh ephemeral one.
    async fn acquire_listener(
        &self,
        key: &str,
        cached: Option<OAuthRegistration>,
    ) -> Result<(LoopbackListener, Option<OAuthRegistration>), OAuthError> {
        if let Some(registration) = cached {
            match registration.redirect_port() {
                Some(port) => match LoopbackListener::bind(port).await {
                    Ok(listener) => return Ok((listener, Some(registration))),
                    Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                        warn!(port, "[OAuth] Registered redirect port is in use, discarding cached registration");
                        self.discard_registration(key).await;
                    }
                    Err(e) => return Err(e.into()),
                },
                None => {
                    warn!("[OAuth] Cached registration has no loopback port, discarding it");
                    self.discard_registration(key).await;
                }
            }
        }

        Ok((LoopbackListener::bind(0).await?, None))
    }

    /// Steps 2 to 6.
    async fn authorize(
        &self,
        resource_url: &str,
        resource: &Url,
        key: &str,
        listener: &mut LoopbackListener,
        registration: Option<OAuthRegistration>,
    ) -> Result<String, OAuthError> {
        let cached_token: Option<OAuthToken> = self.store.read(&token_file(key)).await;
        if let Some(token) = &cached_token {
            if token.is_valid() {
                debug!(resource = %resource_url, "[OAuth] Using cached access token");
                return Ok(token.access_token.clone());
            }
            debug!(resource = %resource_url, expired_at = %token.expires_at(), "[OAuth] Cached access token expired");
        }

        let metadata = self.discovery.discover(resource).await?;
        let scopes = self.requested_scopes(&metadata);
        let registration = self
            .ensure_registration(key, &metadata, listener.redirect_uri(), registration, &scopes)
            .await?;
        let flow = OAuthFlow::new(metadata, registration);

        let refresh_token = cached_token
            .and_then(|token| token.refresh_token)
            .filter(|token| !token.is_empty());
        let refresh_attempted = refresh_token.is_some();

        if let Some(refresh_token) = refresh_token {
            match flow
                .refresh_token(&self.http_client, &refresh_token, resource_url)
                .await
            {
                Ok(token) => {
                    info!(resource = %resource_url, "[OAuth] Access token refreshed");
                    return Ok(self.persist_token(key, token).await);
                }
                Err(e) => {
                    warn!(resource = %resource_url, error = %e, "[OAuth] Token refresh failed, falling back to browser authorization");
                }
            }
        }

        let token = self
            .interactive_grant(&flow, &scopes, resource_url, listener)
            .await
            .map_err(|e| e.after_refresh(refresh_attempted))?;
        info!(resource = %resource_url, "[OAuth] Authorization complete");
        Ok(self.persist_token(key, token).await)
    }

    /// Step 4: reuse an unexpired registration for this redirect URI, else register.
    async fn ensure_registration(
        &self,
        key: &str,
        metadata: &AuthorizationServerMetadata,
        redirect_uri: &str,
        cached: Option<OAuthRegistration>,
        scopes: &[String],
    ) -> Result<OAuthRegistration, OAuthError> {
        if let Some(registration) = cached {
            if !registration.is_expired() && registration.redirect_uri == redirect_uri {
                debug!(client_id = %registration.client_id, "[OAuth] Reusing cached client registration");
                return Ok(registration);
            }
            info!("[OAuth] Cached client registration is expired or stale, registering again");
        }

        let request = DcrRequest::public_client(&self.settings.client_name, redirect_uri, scopes);
        let registration = register_client(
            &self.http_client,
            metadata.registration_endpoint.as_deref(),
            &request,
        )
        .await?;

        if let Err(e) = self.store.write(&registration_file(key), &registration).await {
            warn!(error = %e, "[OAuth] Failed to cache client registration");
        }
        Ok(registration)
    }

    /// Step 6: browser round trip and code exchange.
    async fn interactive_grant(
        &self,
        flow: &OAuthFlow,
        scopes: &[String],
        resource_url: &str,
        listener: &mut LoopbackListener,
    ) -> Result<OAuthToken, OAuthError> {
        let request = flow.create_authorization_request(scopes, resource_url)?;

        info!(resource = %resource_url, "[OAuth] Opening browser for authorization");
        if let Err(e) = self.browser.open(&request.authorization_url) {
            warn!(
                error = %e,
                url = %request.authorization_url,
                "[OAuth] Could not open a browser, open the URL manually"
            );
        }

        let callback = listener
            .wait_for_callback(self.settings.callback_timeout, &self.shutdown)
            .await?;
        let code = callback.into_code(&request.state)?;

        flow.exchange_code(&self.http_client, &code, &request.pkce.verifier, resource_url)
            .await
    }

    fn requested_scopes(&self, metadata: &AuthorizationServerMetadata) -> Vec<String> {
        if !self.settings.scopes.is_empty() {
            return self.settings.scopes.clone();
        }
        metadata.scopes_supported.clone().unwrap_or_default()
    }

    /// Cache writes are best-effort; the token is returned either way.
    async fn persist_token(&self, key: &str, token: OAuthToken) -> String {
        if let Err(e) = self.store.write(&token_file(key), &token).await {
            warn!(error = %e, "[OAuth] Failed to cache access token");
        }
        token.access_token
    }

    async fn discard_registration(&self, key: &str) {
        if let Err(e) = self.store.remove(&registration_file(key)).await {
            warn!(error = %e, "[OAuth] Failed to remove cached client registration");
        }
    }
}

/// Held for the duration of one flow. The map entry is dropped with the last
/// holder or waiter.
struct FlowLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlowLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
