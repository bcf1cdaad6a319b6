//! Backend configuration
//!
//! A backend is one tool server reached either by spawning a local command
//! (stdio) or by connecting to a remote URL (streamable HTTP).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-call tool timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// How a backend is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendTransport {
    /// Spawn a local process and speak over its stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Connect to a remote server over streamable HTTP.
    Http {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// Obtain a bearer token through the OAuth client before connecting.
        #[serde(default = "default_true")]
        oauth: bool,
    },
}

fn default_true() -> bool {
    true
}

impl BackendTransport {
    pub fn transport_type(&self) -> TransportType {
        match self {
            Self::Stdio { .. } => TransportType::Stdio,
            Self::Http { .. } => TransportType::Http,
        }
    }

    /// Remote URL for HTTP backends.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Http { url, .. } => Some(url),
            Self::Stdio { .. } => None,
        }
    }

    pub fn requires_oauth(&self) -> bool {
        matches!(self, Self::Http { oauth: true, .. })
    }
}

/// Transport discriminant, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Stdio,
    Http,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// One configured backend. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub name: String,
    pub transport: BackendTransport,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: BackendTransport::Stdio {
                command: command.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: BackendTransport::Http {
                url: url.into(),
                headers: BTreeMap::new(),
                oauth: true,
            },
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_args(mut self, new_args: Vec<String>) -> Self {
        if let BackendTransport::Stdio { args, .. } = &mut self.transport {
            *args = new_args;
        }
        self
    }

    /// Disable OAuth for an HTTP backend (connect with configured headers only).
    pub fn without_oauth(mut self) -> Self {
        if let BackendTransport::Http { oauth, .. } = &mut self.transport {
            *oauth = false;
        }
        self
    }
}
