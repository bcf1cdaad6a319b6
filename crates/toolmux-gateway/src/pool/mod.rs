//! Backend pool: transports, connections and the multi-server manager

pub mod connection;
pub mod instance;
pub mod server_manager;
pub mod transport;

pub use connection::{BackendConnection, ConnectError, InvocationError};
pub use instance::{McpClient, McpClientHandler};
pub use server_manager::{BackendFailure, InitReport, MultiServerManager, RegisteredBackend};
pub use transport::{
    RmcpTransportFactory, ToolClient, Transport, TransportError, TransportFactory,
    DEFAULT_CONNECT_TIMEOUT,
};
