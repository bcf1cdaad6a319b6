//! Multi-server manager
//!
//! Connects every configured backend concurrently, keeps a registry of the
//! ones that came up together with their tools, and routes namespaced tool
//! calls to the owning backend. One failing backend never affects the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};

use toolmux_core::{
    validate_backend_name, validate_tool_name, BackendConfig, NamespacedToolName,
    ToolNotFoundError, ToolSpec,
};

use super::connection::{BackendConnection, ConnectError};
use super::transport::TransportFactory;
use crate::oauth::OAuthClient;

/// A backend that connected and listed its tools.
#[derive(Debug, Clone)]
pub struct RegisteredBackend {
    pub connection: Arc<BackendConnection>,
    /// Tools as advertised (un-namespaced)
    pub tools: Vec<ToolSpec>,
}

/// A backend that was dropped during `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one `init` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub connected: Vec<String>,
    pub failed: Vec<BackendFailure>,
}

impl InitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct MultiServerManager {
    backends: RwLock<BTreeMap<String, RegisteredBackend>>,
    factory: Arc<dyn TransportFactory>,
    oauth: Option<Arc<OAuthClient>>,
}

impl MultiServerManager {
    pub fn new(factory: Arc<dyn TransportFactory>, oauth: Option<Arc<OAuthClient>>) -> Self {
        Self {
            backends: RwLock::new(BTreeMap::new()),
            factory,
            oauth,
        }
    }

    /// Connect all `configs` concurrently and register those that succeed.
    ///
    /// Names already registered are skipped. Failures are logged and reported
    /// in the returned [`InitReport`]; they never abort the other backends.
    pub async fn init(&self, configs: BTreeMap<String, BackendConfig>) -> InitReport {
        let mut report = InitReport::default();

        let pending: Vec<(String, BackendConfig)> = {
            let backends = self.backends.read().await;
            configs
                .into_iter()
                .filter(|(name, _)| {
                    let registered = backends.contains_key(name);
                    if registered {
                        info!(backend = %name, "[Pool] Already registered, skipping");
                    }
                    !registered
                })
                .collect()
        };

        info!(count = pending.len(), "[Pool] Connecting backends");

        let attempts = pending.into_iter().map(|(name, mut config)| async move {
            // The map key is authoritative for the namespace.
            config.name = name.clone();
            let result = self.connect_backend(config).await;
            (name, result)
        });

        for (name, result) in join_all(attempts).await {
            match result {
                Ok(registered) => {
                    info!(
                        backend = %name,
                        tools = registered.tools.len(),
                        "[Pool] Backend registered"
                    );
                    let previous = self.backends.write().await.insert(name.clone(), registered);
                    if let Some(previous) = previous {
                        // A concurrent init registered the same name; keep the newer one.
                        previous.connection.close().await;
                    }
                    report.connected.push(name);
                }
                Err(e) => {
                    warn!(backend = %name, error = %e, "[Pool] Backend unavailable, skipping");
                    report.failed.push(BackendFailure {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            connected = report.connected.len(),
            failed = report.failed.len(),
            "[Pool] Init complete"
        );
        report
    }

    async fn connect_backend(&self, config: BackendConfig) -> Result<RegisteredBackend, ConnectError> {
        validate_backend_name(&config.name)
            .map_err(|e| ConnectError::Unavailable(e.to_string()))?;

        let connection =
            BackendConnection::connect(config, self.factory.as_ref(), self.oauth.as_deref()).await?;

        let tools = match connection.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                connection.close().await;
                return Err(e);
            }
        };

        let tools = tools
            .into_iter()
            .filter(|tool| {
                let usable = validate_tool_name(&tool.name);
                if let Err(e) = &usable {
                    warn!(
                        backend = %connection.name(),
                        tool = %tool.name,
                        error = %e,
                        "[Pool] Skipping tool whose name cannot be namespaced"
                    );
                }
                usable.is_ok()
            })
            .collect();

        Ok(RegisteredBackend {
            connection: Arc::new(connection),
            tools,
        })
    }

    /// Union of all registered tools, names qualified as `<backend>::<tool>`.
    pub async fn get_tools(&self) -> Vec<ToolSpec> {
        let backends = self.backends.read().await;
        backends
            .iter()
            .flat_map(|(name, backend)| {
                backend
                    .tools
                    .iter()
                    .filter_map(move |tool| tool.namespaced(name).ok())
            })
            .collect()
    }

    /// Route a namespaced call to its backend.
    ///
    /// Resolution failures are a [`ToolNotFoundError`]. Anything that goes
    /// wrong after that is returned as `{"error": message}`.
    pub async fn execute_tool(&self, name: &str, args: Value) -> Result<Value, ToolNotFoundError> {
        let parsed =
            NamespacedToolName::parse(name).map_err(|e| ToolNotFoundError::new(name, e.to_string()))?;

        let connection = {
            let backends = self.backends.read().await;
            let backend = backends
                .get(parsed.backend())
                .ok_or_else(|| ToolNotFoundError::new(name, "unknown backend"))?;
            if !backend.tools.iter().any(|tool| tool.name == parsed.tool()) {
                return Err(ToolNotFoundError::new(name, "unknown tool"));
            }
            Arc::clone(&backend.connection)
        };

        match connection.invoke(parsed.tool(), args).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(tool = %name, error = %e, "[Pool] Tool call failed");
                Ok(json!({ "error": e.to_string() }))
            }
        }
    }

    /// Registered backend names, sorted.
    pub async fn backend_names(&self) -> Vec<String> {
        self.backends.read().await.keys().cloned().collect()
    }

    /// Close one backend and drop its tools. Returns false if it was not registered.
    pub async fn remove_backend(&self, name: &str) -> bool {
        let removed = self.backends.write().await.remove(name);
        match removed {
            Some(backend) => {
                backend.connection.close().await;
                info!(backend = %name, "[Pool] Backend removed");
                true
            }
            None => false,
        }
    }

    /// Close every backend concurrently, then clear the registry.
    pub async fn close(&self) {
        let drained: Vec<RegisteredBackend> = {
            let mut backends = self.backends.write().await;
            std::mem::take(&mut *backends).into_values().collect()
        };

        let count = drained.len();
        join_all(drained.iter().map(|backend| backend.connection.close())).await;
        info!(count, "[Pool] All backends closed");
    }
}
