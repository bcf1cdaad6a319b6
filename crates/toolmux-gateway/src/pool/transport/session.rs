//! [`ToolClient`] over an rmcp client service

use async_trait::async_trait;
use rmcp::model::CallToolRequestParams;
use rmcp::service::Peer;
use rmcp::RoleClient;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{ToolClient, TransportError};
use crate::pool::instance::McpClient;

pub struct RmcpSession {
    backend: String,
    peer: Peer<RoleClient>,
    /// Taken on close
    service: Mutex<Option<McpClient>>,
}

impl RmcpSession {
    pub fn new(backend: impl Into<String>, client: McpClient) -> Self {
        Self {
            backend: backend.into(),
            peer: client.peer().clone(),
            service: Mutex::new(Some(client)),
        }
    }
}

#[async_trait]
impl ToolClient for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<Value>, TransportError> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| TransportError::Request(format!("tools/list failed: {}", e)))?;

        debug!(backend = %self.backend, count = tools.len(), "[Pool] Listed tools");
        tools
            .into_iter()
            .map(|tool| {
                serde_json::to_value(tool)
                    .map_err(|e| TransportError::Request(format!("unserializable tool: {}", e)))
            })
            .collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, TransportError> {
        let result = self
            .peer
            .call_tool(CallToolRequestParams {
                name: name.to_string().into(),
                arguments,
                task: None,
                meta: None,
            })
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        serde_json::to_value(result)
            .map_err(|e| TransportError::Request(format!("unserializable tool result: {}", e)))
    }

    async fn close(&self) -> Result<(), TransportError> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        service
            .cancel()
            .await
            .map(|reason| debug!(backend = %self.backend, reason = ?reason, "[Pool] Session closed"))
            .map_err(|e| TransportError::Closed(e.to_string()))
    }
}
