//! STDIO transport
//!
//! Spawns a backend as a child process and frames MCP over its stdin/stdout.
//! The child is killed on drop, so an abandoned connect attempt cannot leak a
//! process.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

#[cfg(windows)]
#[allow(unused_imports)] // Trait is used via method call in the configure closure
use std::os::windows::process::CommandExt;

use async_trait::async_trait;
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use tokio::process::Command;
use tracing::{debug, info};

use junction_core::TransportKind;

use super::{GatewayClientHandler, McpClient, Transport};
use crate::error::ConnectError;

/// Connector for child-process backends.
pub struct StdioTransport {
    name: String,
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    connect_timeout: Duration,
}

impl StdioTransport {
    pub fn new(
        name: String,
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            name,
            command,
            args,
            env,
            connect_timeout,
        }
    }

    /// Split a command string that may carry embedded arguments.
    ///
    /// Declarations copied from other MCP clients often put everything in one
    /// string ("npx -y @some/server"). When explicit args are present the
    /// command is used as-is.
    fn parse_command(command: &str, args: &[String]) -> Result<(String, Vec<String>), ConnectError> {
        if !args.is_empty() {
            return Ok((command.to_string(), args.to_vec()));
        }

        if command.contains(' ') {
            let parts = shell_words::split(command).map_err(|e| {
                ConnectError::Spawn(format!("failed to parse command string: {e}"))
            })?;
            let Some((executable, rest)) = parts.split_first() else {
                return Err(ConnectError::Spawn("empty command".to_string()));
            };
            Ok((executable.clone(), rest.to_vec()))
        } else {
            Ok((command.to_string(), Vec::new()))
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&self) -> Result<McpClient, ConnectError> {
        let (executable, args) = Self::parse_command(&self.command, &self.args)?;

        info!(
            backend = %self.name,
            executable = %executable,
            args = ?args,
            "connecting to stdio backend"
        );

        let command_path = which::which(&executable)
            .or_else(|_| which::which(format!("{executable}.exe")))
            .map_err(|_| ConnectError::CommandNotFound(executable.clone()))?;

        debug!(backend = %self.name, path = ?command_path, "resolved command");

        let env = self.env.clone();
        let transport = TokioChildProcess::new(Command::new(&command_path).configure(move |cmd| {
            cmd.args(&args)
                .envs(&env)
                .stderr(Stdio::null())
                .kill_on_drop(true);

            // Platform-specific child isolation.
            //
            // Windows: suppress the console window a console-subsystem child
            // would otherwise get.
            //
            // Unix: new process group, so terminal signals aimed at the
            // gateway don't also hit backend children.
            #[cfg(windows)]
            {
                const CREATE_NO_WINDOW: u32 = 0x08000000;
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
            #[cfg(unix)]
            {
                cmd.process_group(0);
            }
        }))
        .map_err(|e| ConnectError::Spawn(e.to_string()))?;

        let handler = GatewayClientHandler::new(&self.name);
        let connect = handler.serve(transport);
        let client = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(ConnectError::Handshake(e.to_string())),
            Err(_) => return Err(ConnectError::Timeout(self.connect_timeout)),
        };

        info!(backend = %self.name, "stdio backend connected");
        Ok(client)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }

    fn description(&self) -> String {
        format!("stdio:{}", self.command)
    }
}
