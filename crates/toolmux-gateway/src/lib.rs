//! ToolMux Gateway
//!
//! Aggregates tools from several MCP backends behind one namespaced registry:
//! - stdio and streamable-HTTP backends via the rmcp SDK
//! - autonomous OAuth 2.1 client (discovery, dynamic registration, PKCE)
//! - concurrent connect/close with per-backend failure isolation

pub mod oauth;
pub mod pool;

pub use oauth::{BrowserLauncher, OAuthClient, OAuthError, OAuthSettings, SystemBrowser};
pub use pool::{
    BackendConnection, BackendFailure, ConnectError, InitReport, InvocationError,
    MultiServerManager, RmcpTransportFactory, ToolClient, Transport, TransportError,
    TransportFactory,
};
