//! rmcp client handler for backend sessions

use rmcp::model::{ClientCapabilities, ClientInfo, Implementation, LoggingLevel};
use rmcp::service::{NotificationContext, RunningService};
use rmcp::RoleClient;
use tracing::{debug, error, info, warn};

use toolmux_core::branding;

/// Type alias for the MCP client service
pub type McpClient = RunningService<RoleClient, McpClientHandler>;

/// Client handler for one backend session
#[derive(Clone)]
pub struct McpClientHandler {
    info: ClientInfo,
    backend: String,
}

impl std::fmt::Debug for McpClientHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientHandler")
            .field("backend", &self.backend)
            .finish()
    }
}

impl McpClientHandler {
    pub fn new(backend: &str) -> Self {
        Self {
            info: ClientInfo {
                protocol_version: Default::default(),
                capabilities: ClientCapabilities::default(),
                client_info: Implementation {
                    name: branding::mcp_client_name(backend),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    title: Some(branding::DISPLAY_NAME.to_string()),
                    icons: None,
                    website_url: None,
                    ..Default::default()
                },
                meta: None,
            },
            backend: backend.to_string(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl rmcp::ClientHandler for McpClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }

    fn on_tool_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        let backend = self.backend.clone();
        async move {
            // The registry is a snapshot taken at init; a re-init picks up the change.
            info!(backend = %backend, "[Pool] Backend sent tools/list_changed");
        }
    }

    fn on_logging_message(
        &self,
        params: rmcp::model::LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        let backend = self.backend.clone();
        async move {
            let message = match &params.data {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let logger = params.logger.as_deref().unwrap_or("");

            match params.level {
                LoggingLevel::Debug => debug!(backend = %backend, logger, "[Backend] {}", message),
                LoggingLevel::Info | LoggingLevel::Notice => {
                    info!(backend = %backend, logger, "[Backend] {}", message)
                }
                LoggingLevel::Warning => warn!(backend = %backend, logger, "[Backend] {}", message),
                LoggingLevel::Error
                | LoggingLevel::Critical
                | LoggingLevel::Alert
                | LoggingLevel::Emergency => {
                    error!(backend = %backend, logger, "[Backend] {}", message)
                }
            }
        }
    }
}
