//! Mock transport implementations for testing
//!
//! In-memory backends driven by a [`MockBackend`] script, so the manager can
//! be exercised without spawning processes or opening sockets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use toolmux_core::{BackendTransport, TransportType};
use toolmux_gateway::{ToolClient, Transport, TransportError, TransportFactory};

/// A well-formed tool descriptor as a backend would advertise it.
pub fn tool_descriptor(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("Test tool: {}", name),
        "inputSchema": { "type": "object", "properties": {} }
    })
}

/// Script for one mock backend.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    pub tools: Vec<Value>,
    pub connect_error: Option<String>,
    pub list_error: Option<String>,
    pub list_delay: Option<Duration>,
    pub failing_tools: Vec<String>,
    pub call_delay: Option<Duration>,
    pub close_error: Option<String>,
    pub close_delay: Option<Duration>,
}

impl MockBackend {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|name| tool_descriptor(name)).collect(),
            ..Self::default()
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_descriptor(mut self, descriptor: Value) -> Self {
        self.tools.push(descriptor);
        self
    }

    pub fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn with_failing_tool(mut self, name: &str) -> Self {
        self.failing_tools.push(name.to_string());
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn with_close_error(mut self, message: &str) -> Self {
        self.close_error = Some(message.to_string());
        self
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }
}

/// A tool call that reached a mock backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub backend: String,
    pub tool: String,
    pub arguments: Option<Map<String, Value>>,
}

/// What the mocks observed, shared across factory, transports and clients.
#[derive(Debug, Default)]
pub struct MockState {
    calls: Mutex<Vec<RecordedCall>>,
    bearer_tokens: Mutex<HashMap<String, Option<String>>>,
    closed: Mutex<Vec<String>>,
    connects: AtomicUsize,
}

impl MockState {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Bearer token handed to the factory for `backend` (outer `None` if never created).
    pub fn bearer_token(&self, backend: &str) -> Option<Option<String>> {
        self.bearer_tokens.lock().get(backend).cloned()
    }

    pub fn closed(&self) -> Vec<String> {
        let mut closed = self.closed.lock().clone();
        closed.sort();
        closed
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

/// [`TransportFactory`] serving scripted backends by name.
#[derive(Debug, Default)]
pub struct MockTransportFactory {
    backends: HashMap<String, MockBackend>,
    state: Arc<MockState>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, name: &str, backend: MockBackend) -> Self {
        self.backends.insert(name.to_string(), backend);
        self
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(
        &self,
        backend: &str,
        transport: &BackendTransport,
        bearer_token: Option<String>,
    ) -> Box<dyn Transport> {
        self.state
            .bearer_tokens
            .lock()
            .insert(backend.to_string(), bearer_token);

        Box::new(MockTransport {
            backend: backend.to_string(),
            transport_type: transport.transport_type(),
            script: self.backends.get(backend).cloned(),
            state: Arc::clone(&self.state),
        })
    }
}

struct MockTransport {
    backend: String,
    transport_type: TransportType,
    script: Option<MockBackend>,
    state: Arc<MockState>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, TransportError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let script = self.script.clone().ok_or_else(|| {
            TransportError::Spawn(format!("no mock backend named '{}'", self.backend))
        })?;
        if let Some(message) = &script.connect_error {
            return Err(TransportError::Spawn(message.clone()));
        }

        Ok(Box::new(MockToolClient {
            backend: self.backend.clone(),
            script,
            state: Arc::clone(&self.state),
        }))
    }

    fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    fn description(&self) -> String {
        format!("mock:{}", self.backend)
    }
}

struct MockToolClient {
    backend: String,
    script: MockBackend,
    state: Arc<MockState>,
}

#[async_trait]
impl ToolClient for MockToolClient {
    async fn list_tools(&self) -> Result<Vec<Value>, TransportError> {
        if let Some(delay) = self.script.list_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script.list_error {
            Some(message) => Err(TransportError::Request(message.clone())),
            None => Ok(self.script.tools.clone()),
        }
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, TransportError> {
        self.state.calls.lock().push(RecordedCall {
            backend: self.backend.clone(),
            tool: name.to_string(),
            arguments: arguments.clone(),
        });

        if let Some(delay) = self.script.call_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.failing_tools.iter().any(|tool| tool == name) {
            return Err(TransportError::Request(format!("{} exploded", name)));
        }

        Ok(json!({
            "content": [{ "type": "text", "text": format!("{}:{}", self.backend, name) }],
            "arguments": arguments.map(Value::Object).unwrap_or(Value::Null),
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.closed.lock().push(self.backend.clone());
        if let Some(delay) = self.script.close_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script.close_error {
            Some(message) => Err(TransportError::Closed(message.clone())),
            None => Ok(()),
        }
    }
}
