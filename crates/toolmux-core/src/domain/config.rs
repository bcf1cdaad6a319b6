//! `mcpServers` configuration files
//!
//! Parses the JSON format shared by most MCP hosts:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "fs": { "command": "npx -y @modelcontextprotocol/server-filesystem", "args": ["/tmp"] },
//!     "api": { "url": "https://api.example.com/mcp", "timeout": 120000 }
//!   }
//! }
//! ```
//!
//! Entries are parsed independently so one malformed backend never hides the others.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::backend::{BackendConfig, BackendTransport, DEFAULT_TOOL_TIMEOUT};
use super::tool::validate_backend_name;
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "mcpServers", default)]
    servers: BTreeMap<String, Value>,
}

/// One raw entry under `mcpServers`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendEntry {
    command: Option<String>,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    url: Option<String>,
    headers: BTreeMap<String, String>,
    oauth: Option<bool>,
    /// Per-call timeout in milliseconds.
    timeout: Option<u64>,
    disabled: bool,
}

impl BackendEntry {
    fn into_config(self, name: &str) -> Result<BackendConfig, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEntry {
            name: name.to_string(),
            reason,
        };

        validate_backend_name(name).map_err(|e| invalid(e.to_string()))?;

        let transport = match (self.command, self.url) {
            (Some(command), None) => {
                if command.trim().is_empty() {
                    return Err(invalid("command is empty".to_string()));
                }
                BackendTransport::Stdio {
                    command,
                    args: self.args,
                    env: self.env,
                }
            }
            (None, Some(url)) => {
                Url::parse(&url).map_err(|e| invalid(format!("invalid url '{}': {}", url, e)))?;
                BackendTransport::Http {
                    url,
                    headers: self.headers,
                    oauth: self.oauth.unwrap_or(true),
                }
            }
            (Some(_), Some(_)) => {
                return Err(invalid("both 'command' and 'url' are set".to_string()))
            }
            (None, None) => return Err(invalid("one of 'command' or 'url' is required".to_string())),
        };

        let timeout = match self.timeout {
            Some(0) => return Err(invalid("timeout must be greater than zero".to_string())),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_TOOL_TIMEOUT,
        };

        Ok(BackendConfig {
            name: name.to_string(),
            transport,
            timeout,
        })
    }
}

/// Result of parsing one config document.
#[derive(Debug, Default)]
pub struct ParsedBackends {
    pub configs: BTreeMap<String, BackendConfig>,
    /// Entries that were skipped.
    pub errors: Vec<ConfigError>,
}

/// Parse an `mcpServers` document. Only an unreadable top level is an error;
/// bad entries are collected in [`ParsedBackends::errors`] and logged.
pub fn parse_backend_configs(json: &str) -> Result<ParsedBackends, ConfigError> {
    let file: ConfigFile = serde_json::from_str(json)?;
    let mut parsed = ParsedBackends::default();

    for (name, raw) in file.servers {
        let entry: BackendEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                let error = ConfigError::InvalidEntry {
                    name: name.clone(),
                    reason: e.to_string(),
                };
                warn!(backend = %name, error = %error, "Skipping malformed backend config");
                parsed.errors.push(error);
                continue;
            }
        };

        if entry.disabled {
            info!(backend = %name, "Backend disabled in config, skipping");
            continue;
        }

        match entry.into_config(&name) {
            Ok(config) => {
                parsed.configs.insert(name, config);
            }
            Err(error) => {
                warn!(backend = %name, error = %error, "Skipping malformed backend config");
                parsed.errors.push(error);
            }
        }
    }

    Ok(parsed)
}

/// Read and parse a config file.
pub async fn load_backend_configs(path: &Path) -> Result<ParsedBackends, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_backend_configs(&content)
}

/// Merge config maps in priority order. The first definition of a name wins;
/// later duplicates are dropped with a warning.
pub fn merge_backend_configs<I>(sources: I) -> BTreeMap<String, BackendConfig>
where
    I: IntoIterator<Item = BTreeMap<String, BackendConfig>>,
{
    let mut merged = BTreeMap::new();
    for source in sources {
        for (name, config) in source {
            if merged.contains_key(&name) {
                warn!(backend = %name, "Duplicate backend name, keeping first definition");
                continue;
            }
            merged.insert(name, config);
        }
    }
    merged
}
