//! Model Context Protocol tool servers.
//!
//! Each configured server is a child process speaking MCP over stdio. Its
//! tools are listed once at connect time and exposed as [`Tool`]s.

pub mod server;
pub mod tool;
pub mod transport;

use std::sync::Arc;

pub use server::{McpServer, ToolSpec};
pub use tool::McpTool;
pub use transport::{McpSession, McpTransport, StdioTransport};

use crate::config::McpServerConfig;
use crate::error::ParleyError;
use crate::tools::Tool;

/// Spawn the configured server and return its tools.
///
/// The session lives as long as any returned tool. Use [`McpServer::connect`]
/// when the caller needs to close it explicitly.
pub async fn server_tools(config: &McpServerConfig) -> Result<Vec<Arc<dyn Tool>>, ParleyError> {
    Ok(McpServer::connect(config).await?.tools())
}
