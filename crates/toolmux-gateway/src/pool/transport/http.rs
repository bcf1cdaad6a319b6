//! Remote backends over streamable HTTP
//!
//! Configured headers and the bearer token are set as default headers on the
//! underlying reqwest client, so every request of the session carries them.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use tracing::{debug, info};

use super::session::RmcpSession;
use super::{ToolClient, Transport, TransportError, TransportType};
use crate::pool::instance::McpClientHandler;

pub struct HttpTransport {
    backend: String,
    url: String,
    headers: BTreeMap<String, String>,
    bearer_token: Option<String>,
    connect_timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        backend: String,
        url: String,
        headers: BTreeMap<String, String>,
        bearer_token: Option<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            url,
            headers,
            bearer_token,
            connect_timeout,
        }
    }

    /// Build default headers from config plus the bearer token.
    fn build_default_headers(&self) -> Result<HeaderMap, TransportError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TransportError::InvalidConfig(format!("invalid header name '{}': {}", key, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidConfig(format!("invalid header value for '{}': {}", key, e))
            })?;
            header_map.insert(header_name, header_value);
        }

        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                TransportError::InvalidConfig("access token is not a valid header value".to_string())
            })?;
            value.set_sensitive(true);
            header_map.insert(AUTHORIZATION, value);
        }

        Ok(header_map)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, TransportError> {
        info!(
            backend = %self.backend,
            url = %self.url,
            authenticated = self.bearer_token.is_some(),
            "[Pool] Connecting to HTTP backend"
        );

        let header_map = self.build_default_headers()?;
        debug!(backend = %self.backend, header_count = header_map.len(), "[Pool] Built default headers");

        let http_client = reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| TransportError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        let transport = StreamableHttpClientTransport::with_client(
            http_client,
            StreamableHttpClientTransportConfig::with_uri(self.url.as_str()),
        );
        let handler = McpClientHandler::new(&self.backend);

        let client = match tokio::time::timeout(self.connect_timeout, handler.serve(transport)).await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(TransportError::Handshake(e.to_string())),
            Err(_) => return Err(TransportError::Timeout(self.connect_timeout)),
        };

        info!(backend = %self.backend, "[Pool] HTTP backend connected");
        Ok(Box::new(RmcpSession::new(&self.backend, client)))
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Http
    }

    fn description(&self) -> String {
        format!("http:{}", self.url)
    }
}
