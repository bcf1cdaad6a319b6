//! Local backends spawned as child processes speaking MCP over stdio

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::session::RmcpSession;
use super::{ToolClient, Transport, TransportError, TransportType};
use crate::pool::instance::McpClientHandler;

pub struct StdioTransport {
    backend: String,
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    connect_timeout: Duration,
}

impl StdioTransport {
    pub fn new(
        backend: String,
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            command,
            args,
            env,
            connect_timeout,
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, TransportError> {
        info!(
            backend = %self.backend,
            command = %self.command,
            "[Pool] Connecting to stdio backend"
        );

        let (program, args) = parse_command(&self.command, &self.args)?;

        let command_path = which::which(&program)
            .or_else(|_| which::which(format!("{}.exe", program)))
            .map_err(|_| {
                let err = format!(
                    "Command not found: {}. Ensure it's installed and in PATH.",
                    program
                );
                error!(backend = %self.backend, "{}", err);
                TransportError::Spawn(err)
            })?;

        debug!(backend = %self.backend, path = ?command_path, "[Pool] Found command");

        let env = self.env.clone();
        let transport = TokioChildProcess::new(Command::new(&command_path).configure(move |cmd| {
            cmd.args(&args)
                .envs(&env)
                .stderr(Stdio::null())
                .kill_on_drop(true);
            configure_child_process_platform(cmd);
        }))
        .map_err(|e| TransportError::Spawn(format!("failed to spawn process: {}", e)))?;

        let handler = McpClientHandler::new(&self.backend);
        let client = match tokio::time::timeout(self.connect_timeout, handler.serve(transport)).await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(TransportError::Handshake(e.to_string())),
            Err(_) => return Err(TransportError::Timeout(self.connect_timeout)),
        };

        info!(backend = %self.backend, "[Pool] Stdio backend connected");
        Ok(Box::new(RmcpSession::new(&self.backend, client)))
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }

    fn description(&self) -> String {
        format!("stdio:{}", self.command)
    }
}

/// Split a configured command into program and arguments.
///
/// With explicit `args` the command is taken as the program. Otherwise it may
/// be a whole command line and is split with shell quoting rules.
pub fn parse_command(command: &str, args: &[String]) -> Result<(String, Vec<String>), TransportError> {
    if !args.is_empty() {
        return Ok((command.to_string(), args.to_vec()));
    }

    let mut parts = shell_words::split(command).map_err(|e| {
        TransportError::InvalidConfig(format!(
            "failed to parse command '{}' (check for unmatched quotes): {}",
            command, e
        ))
    })?;
    if parts.is_empty() {
        return Err(TransportError::InvalidConfig("empty command".to_string()));
    }

    let program = parts.remove(0);
    Ok((program, parts))
}

/// Detach the child from the host's console and signal group.
pub fn configure_child_process_platform(cmd: &mut Command) {
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}
