//! MCP tools as participant tools.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, JsonObject, ResourceContents};

use super::server::{McpServer, ToolSpec};
use crate::error::ParleyError;
use crate::tools::{Tool, ToolArguments, ToolContext, ToolSchema};

/// One tool on a connected server. Holding it keeps the server alive.
#[derive(Debug)]
pub struct McpTool {
    server: Arc<McpServer>,
    spec: ToolSpec,
}

impl McpTool {
    pub(crate) fn new(server: Arc<McpServer>, spec: ToolSpec) -> Self {
        Self { server, spec }
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn schema(&self) -> &ToolSchema {
        &self.spec.schema
    }

    async fn call(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, ParleyError> {
        tracing::debug!(
            server = %self.server.name(),
            tool = %self.spec.name,
            caller = ctx.caller.as_deref().unwrap_or("-"),
            "MCP tool call"
        );
        self.server.call(&self.spec.name, args).await
    }
}

/// Models send arguments as an object, a JSON string holding one, or nothing.
pub(crate) fn coerce_arguments(
    value: serde_json::Value,
) -> Result<Option<JsonObject>, ParleyError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) => Ok(Some(map)),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(None),
        serde_json::Value::String(raw) => {
            let parsed = serde_json::from_str(raw.trim()).map_err(|e| {
                ParleyError::InvalidArgument(format!("tool arguments are not valid JSON: {e}"))
            })?;
            match parsed {
                serde_json::Value::String(_) => Err(ParleyError::InvalidArgument(
                    "tool arguments must be a JSON object".into(),
                )),
                other => coerce_arguments(other),
            }
        }
        other => Err(ParleyError::InvalidArgument(format!(
            "tool arguments must be a JSON object, got {other}"
        ))),
    }
}

/// Text parts of a result, one per line.
fn text_of(content: &[Content]) -> Option<String> {
    let lines: Vec<&str> = content
        .iter()
        .filter_map(|item| {
            if let Some(text) = item.as_text() {
                return Some(text.text.as_str());
            }
            match &item.as_resource()?.resource {
                ResourceContents::TextResourceContents { text, .. } => Some(text.as_str()),
                _ => None,
            }
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// What the participant sees: structured content if present, else the text,
/// else the raw content items. Error results become `ToolExecution` errors.
pub(crate) fn call_result_to_value(
    tool: &str,
    result: CallToolResult,
) -> Result<serde_json::Value, ParleyError> {
    let text = text_of(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .map(|v| v.to_string())
            .or(text)
            .unwrap_or_else(|| "tool reported an error".into());
        return Err(ParleyError::ToolExecution {
            tool_name: tool.to_string(),
            message,
        });
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    if let Some(text) = text {
        return Ok(serde_json::Value::String(text));
    }
    Ok(serde_json::Value::Array(
        result
            .content
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect(),
    ))
}
