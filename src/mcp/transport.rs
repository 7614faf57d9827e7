//! How a tool server process is started and handshaken.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceExt};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;

use crate::config::McpServerConfig;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
/// An initialized client session with one server.
pub type McpSession = RunningService<RoleClient, DynClientService>;

/// Something that can open an initialized rmcp session.
#[async_trait]
pub trait McpTransport: Send {
    /// Spawn or dial the server and complete the initialize handshake.
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<McpSession, ClientInitializeError>;

    /// Human-readable label used in logs and errors.
    fn describe(&self) -> String;
}

/// Stdio-based MCP transport for local tool servers (`uvx mcp-server-fetch`,
/// `npx -y @modelcontextprotocol/server-filesystem <root>` and the like).
#[derive(Debug, Clone)]
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl StdioTransport {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &McpServerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command.args(&self.args).envs(&self.env);
        command
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<McpSession, ClientInitializeError> {
        tracing::debug!(command = %self.command, args = ?self.args, "spawning MCP server");
        let transport = TokioChildProcess::new(self.build_command()).map_err(|error| {
            ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
        })?;

        client_info.into_dyn().serve(transport).await
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}
