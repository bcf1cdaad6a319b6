//! One live session with one backend

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use toolmux_core::{BackendConfig, BackendTransport, ToolSpec};

use super::transport::{ToolClient, TransportError, TransportFactory};
use crate::oauth::{OAuthClient, OAuthError};

/// A backend could not be brought up.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("authorization failed: {0}")]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("tool discovery failed: {0}")]
    ToolDiscovery(TransportError),
}

/// A tool call on a connected backend failed.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("tool call timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Backend(String),
}

pub struct BackendConnection {
    config: BackendConfig,
    client: Box<dyn ToolClient>,
}

impl std::fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConnection")
            .field("name", &self.config.name)
            .field("transport", &self.config.transport.transport_type())
            .finish()
    }
}

impl BackendConnection {
    /// Establish a session for `config`.
    ///
    /// Remote backends that require OAuth obtain a bearer token first; without
    /// an [`OAuthClient`] such a backend is unavailable.
    pub async fn connect(
        config: BackendConfig,
        factory: &dyn TransportFactory,
        oauth: Option<&OAuthClient>,
    ) -> Result<Self, ConnectError> {
        let bearer_token = match &config.transport {
            BackendTransport::Http { url, oauth: true, .. } => {
                let Some(oauth) = oauth else {
                    return Err(ConnectError::Unavailable(format!(
                        "{} requires OAuth but no OAuth client is configured",
                        url
                    )));
                };
                Some(oauth.get_valid_access_token(url).await?)
            }
            _ => None,
        };

        let transport = factory.create(&config.name, &config.transport, bearer_token);
        debug!(
            backend = %config.name,
            transport = %transport.description(),
            "[Pool] Connecting"
        );
        let client = transport.connect().await?;

        info!(
            backend = %config.name,
            transport_type = %transport.transport_type(),
            "[Pool] Backend connected"
        );
        Ok(Self { config, client })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Tools advertised by the backend, minus malformed descriptors.
    ///
    /// Bounded by the backend's configured timeout.
    pub async fn list_tools(&self) -> Result<Vec<ToolSpec>, ConnectError> {
        let timeout = self.config.timeout;
        let descriptors = tokio::time::timeout(timeout, self.client.list_tools())
            .await
            .map_err(|_| ConnectError::ToolDiscovery(TransportError::Timeout(timeout)))?
            .map_err(ConnectError::ToolDiscovery)?;

        let total = descriptors.len();
        let tools: Vec<ToolSpec> = descriptors
            .iter()
            .filter_map(|descriptor| {
                let spec = ToolSpec::from_descriptor(descriptor);
                if spec.is_none() {
                    warn!(
                        backend = %self.config.name,
                        tool = %descriptor.get("name").and_then(serde_json::Value::as_str).unwrap_or("<unnamed>"),
                        "[Pool] Dropping malformed tool descriptor"
                    );
                }
                spec
            })
            .collect();

        debug!(
            backend = %self.config.name,
            advertised = total,
            accepted = tools.len(),
            "[Pool] Tool discovery complete"
        );
        Ok(tools)
    }

    /// Call `tool` with the backend's configured timeout.
    pub async fn invoke(&self, tool: &str, args: Value) -> Result<Value, InvocationError> {
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(InvocationError::InvalidArguments(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.client.call_tool(tool, arguments)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(InvocationError::Backend(e.to_string())),
            Err(_) => Err(InvocationError::Timeout(timeout)),
        }
    }

    /// Close the session. Errors are logged, never returned.
    pub async fn close(&self) {
        match self.client.close().await {
            Ok(()) => info!(backend = %self.config.name, "[Pool] Backend closed"),
            Err(e) => warn!(backend = %self.config.name, error = %e, "[Pool] Error closing backend"),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
