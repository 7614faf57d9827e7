//! A connected tool server: one child process, one session, a fixed tool list.

use std::sync::Arc;

use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo, ProtocolVersion};
use rmcp::service::{ClientInitializeError, ServiceError};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::tool::{call_result_to_value, coerce_arguments, McpTool};
use super::transport::{McpSession, McpTransport, StdioTransport};
use crate::config::McpServerConfig;
use crate::error::ParleyError;
use crate::tools::{Tool, ToolArguments, ToolSchema};

/// A tool as advertised by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
}

/// A live MCP server.
///
/// Requests are serialised: the session sits behind a mutex, and turns are
/// sequential anyway. Dropping the last handle shuts the child process down.
pub struct McpServer {
    name: String,
    session: Mutex<Option<McpSession>>,
    tools: Vec<ToolSpec>,
}

impl McpServer {
    /// Spawn the configured server, handshake and list its tools.
    pub async fn connect(config: &McpServerConfig) -> Result<Arc<Self>, ParleyError> {
        Self::start(config.name.clone(), StdioTransport::from_config(config)).await
    }

    pub async fn start(
        name: impl Into<String>,
        mut transport: impl McpTransport,
    ) -> Result<Arc<Self>, ParleyError> {
        let name = name.into();
        let session = open_session(&mut transport).await?;
        let tools = match list_tools(&session).await {
            Ok(tools) => tools,
            Err(error) => {
                let _ = session.cancel().await;
                return Err(error);
            }
        };
        info!(
            server = %name,
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "MCP server ready"
        );
        Ok(Arc::new(Self {
            name,
            session: Mutex::new(Some(session)),
            tools,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Every advertised tool, as something a participant can call.
    pub fn tools(self: &Arc<Self>) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .map(|spec| Arc::new(McpTool::new(Arc::clone(self), spec.clone())) as Arc<dyn Tool>)
            .collect()
    }

    /// Run one tool on the server.
    pub async fn call(
        &self,
        tool: &str,
        args: &ToolArguments,
    ) -> Result<serde_json::Value, ParleyError> {
        let arguments = coerce_arguments(args.raw().clone())?;
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(|| self.closed())?;
        if session.is_closed() {
            return Err(self.closed());
        }

        debug!(server = %self.name, tool, "calling MCP tool");
        let result: CallToolResult = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: tool.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| service_error("call_tool", e))?;
        call_result_to_value(tool, result)
    }

    /// Shut the session down. Later calls fail; closing twice is a no-op.
    pub async fn close(&self) -> Result<(), ParleyError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        session
            .cancel()
            .await
            .map(|reason| debug!(server = %self.name, ?reason, "MCP session closed"))
            .map_err(|e| ParleyError::Stream(format!("MCP server '{}' did not shut down: {e}", self.name)))
    }

    fn closed(&self) -> ParleyError {
        ParleyError::Stream(format!("MCP server '{}' is closed", self.name))
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .finish()
    }
}

/// Handshake with the newest protocol, falling back once to 2024-11-05 for
/// servers that reject it.
pub(crate) async fn open_session(
    transport: &mut dyn McpTransport,
) -> Result<McpSession, ParleyError> {
    let latest = ClientInfo {
        protocol_version: ProtocolVersion::LATEST,
        ..Default::default()
    };
    let error = match transport.connect(latest).await {
        Ok(session) => return Ok(session),
        Err(error) => error,
    };
    if !rejects_protocol_version(&error) {
        return Err(initialize_error(transport.describe(), error));
    }

    debug!(server = %transport.describe(), "retrying MCP handshake with protocol 2024-11-05");
    let legacy = ClientInfo {
        protocol_version: ProtocolVersion::V_2024_11_05,
        ..Default::default()
    };
    transport
        .connect(legacy)
        .await
        .map_err(|error| initialize_error(transport.describe(), error))
}

async fn list_tools(session: &McpSession) -> Result<Vec<ToolSpec>, ParleyError> {
    let tools = match session.list_all_tools().await {
        Ok(tools) => tools,
        // Servers without pagination support answer the first page only.
        Err(ServiceError::UnexpectedResponse) => {
            session
                .list_tools(None)
                .await
                .map_err(|e| service_error("list_tools", e))?
                .tools
        }
        Err(e) => return Err(service_error("list_tools", e)),
    };
    Ok(tools.into_iter().map(tool_spec).collect())
}

fn tool_spec(tool: rmcp::model::Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        schema: ToolSchema::from_value(serde_json::Value::Object((*tool.input_schema).clone())),
    }
}

fn rejects_protocol_version(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(data) => {
            let message = data.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn initialize_error(server: String, error: ClientInitializeError) -> ParleyError {
    match error {
        ClientInitializeError::JsonRpcError(data) => ParleyError::Provider {
            provider: "mcp".into(),
            message: format!("{server}: handshake rejected ({}): {}", data.code.0, data.message),
        },
        other => ParleyError::Stream(format!("{server}: handshake failed: {other}")),
    }
}

fn service_error(operation: &str, error: ServiceError) -> ParleyError {
    match error {
        ServiceError::Timeout { timeout } => ParleyError::Timeout(timeout.as_millis() as u64),
        ServiceError::McpError(data) => ParleyError::Provider {
            provider: "mcp".into(),
            message: format!("{operation}: error {}: {}", data.code.0, data.message),
        },
        error @ (ServiceError::TransportClosed
        | ServiceError::TransportSend(_)
        | ServiceError::Cancelled { .. }) => ParleyError::Stream(format!("{operation}: {error}")),
        other => ParleyError::Provider {
            provider: "mcp".into(),
            message: format!("{operation}: {other}"),
        },
    }
}
