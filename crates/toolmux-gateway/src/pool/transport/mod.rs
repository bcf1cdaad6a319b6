//! Transport abstraction for backend sessions
//!
//! [`Transport`] establishes a session; the session itself is a [`ToolClient`]
//! (list tools, call a tool, close). [`TransportFactory`] picks the transport
//! for a [`BackendTransport`] variant and is the seam tests replace.

mod http;
mod session;
mod stdio;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use http::HttpTransport;
pub use session::RmcpSession;
pub use stdio::{configure_child_process_platform, parse_command, StdioTransport};

pub use toolmux_core::{BackendTransport, TransportType};

/// Default bound on establishing a session (spawn/connect + handshake)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid transport config: {0}")]
    InvalidConfig(String),

    #[error("failed to start backend: {0}")]
    Spawn(String),

    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("close failed: {0}")]
    Closed(String),
}

/// An established session with one backend.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Raw tool descriptors (`{name, description, inputSchema, ...}`)
    async fn list_tools(&self) -> Result<Vec<Value>, TransportError>;

    /// Call one tool; the result is returned as the backend sent it.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Transport trait for backend connections
///
/// Each implementation handles one way of reaching a backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, TransportError>;

    fn transport_type(&self) -> TransportType;

    /// Description for logging (never includes credentials)
    fn description(&self) -> String;
}

/// Creates the transport for a backend.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        backend: &str,
        transport: &BackendTransport,
        bearer_token: Option<String>,
    ) -> Box<dyn Transport>;
}

/// Production factory backed by the rmcp SDK
#[derive(Debug, Clone)]
pub struct RmcpTransportFactory {
    connect_timeout: Duration,
}

impl RmcpTransportFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for RmcpTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl TransportFactory for RmcpTransportFactory {
    fn create(
        &self,
        backend: &str,
        transport: &BackendTransport,
        bearer_token: Option<String>,
    ) -> Box<dyn Transport> {
        match transport {
            BackendTransport::Stdio { command, args, env } => Box::new(StdioTransport::new(
                backend.to_string(),
                command.clone(),
                args.clone(),
                env.clone(),
                self.connect_timeout,
            )),
            BackendTransport::Http { url, headers, .. } => Box::new(HttpTransport::new(
                backend.to_string(),
                url.clone(),
                headers.clone(),
                bearer_token,
                self.connect_timeout,
            )),
        }
    }
}
