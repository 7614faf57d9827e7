//! Text generation with tool loop.

use tracing::{debug, warn};

use crate::error::ParleyError;
use crate::provider::format::tool_result_to_string;
use crate::provider::{ModelProvider, ProviderRequest};
use crate::tools::{ToolArguments, ToolContext, ToolInvoker};
use crate::types::*;

/// Default ceiling on model calls per reply.
pub const MAX_TOOL_ITERATIONS: usize = 20;

/// Options for one [`generate_text`] call.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Call the model again after tool execution for a final answer. When
    /// off, the reply is the tool output itself.
    pub reflect_on_tool_use: bool,
    pub max_tool_iterations: usize,
    /// Participant name passed to tools as the caller.
    pub caller: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            reflect_on_tool_use: true,
            max_tool_iterations: MAX_TOOL_ITERATIONS,
            caller: None,
        }
    }
}

/// One model call and the tools it triggered.
#[derive(Debug, Clone)]
pub struct GenerationStep {
    pub text: String,
    pub tool_calls: Vec<AgentToolCall>,
    pub tool_results: Vec<AgentToolResult>,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone)]
pub struct GenerateTextResult {
    pub text: String,
    pub steps: Vec<GenerationStep>,
    /// Full conversation including tool round trips.
    pub messages: Vec<ModelMessage>,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

/// Generate text with an optional tool loop.
///
/// If the model returns tool calls they are executed through `invoker` and
/// fed back until the model produces a final text response or the iteration
/// limit is hit. Tool failures (including calls to undeclared tools) become
/// error results the model can see; they never abort the loop.
pub async fn generate_text(
    provider: &dyn ModelProvider,
    mut messages: Vec<ModelMessage>,
    settings: GenerationSettings,
    invoker: &ToolInvoker,
    options: &GenerateOptions,
) -> Result<GenerateTextResult, ParleyError> {
    let tool_defs = if invoker.is_empty() {
        None
    } else {
        Some(invoker.definitions())
    };
    let ctx = match &options.caller {
        Some(caller) => ToolContext::for_caller(caller.clone()),
        None => ToolContext::default(),
    };

    let mut steps = Vec::new();
    let mut total_usage = Usage::default();

    for iteration in 0..options.max_tool_iterations.max(1) {
        let request = ProviderRequest {
            messages: messages.clone(),
            settings: settings.clone(),
            tools: tool_defs.clone(),
        };

        debug!(iteration, provider = provider.provider_name(), "generate_text: calling provider");
        let response = provider.generate_text(&request).await?;
        total_usage.merge(&response.usage);

        let mut step = GenerationStep {
            text: response.text.clone(),
            tool_calls: response.tool_calls.clone(),
            tool_results: Vec::new(),
            usage: response.usage,
            finish_reason: response.finish_reason,
        };

        if response.tool_calls.is_empty() {
            steps.push(step);
            return Ok(GenerateTextResult {
                text: response.text,
                steps,
                messages,
                usage: total_usage,
                finish_reason: response.finish_reason,
            });
        }

        messages.push(ModelMessage::assistant_tool_calls(
            response.text.clone(),
            &response.tool_calls,
        ));

        for call in &response.tool_calls {
            let args = ToolArguments::new(call.arguments.clone());
            let result = match invoker.invoke(&call.name, &args, &ctx).await {
                Ok(value) => AgentToolResult {
                    tool_call_id: call.id.clone(),
                    result: value,
                    is_error: false,
                },
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                    AgentToolResult {
                        tool_call_id: call.id.clone(),
                        result: serde_json::json!({ "error": e.to_string() }),
                        is_error: true,
                    }
                }
            };
            step.tool_results.push(result.clone());
            messages.push(ModelMessage::tool_result(
                result.tool_call_id,
                result.result,
                result.is_error,
            ));
        }

        if !options.reflect_on_tool_use {
            let text = summarize_tool_results(&step.tool_results);
            steps.push(step);
            return Ok(GenerateTextResult {
                text,
                steps,
                messages,
                usage: total_usage,
                finish_reason: Some(FinishReason::ToolCalls),
            });
        }

        steps.push(step);
    }

    warn!(
        max_iterations = options.max_tool_iterations,
        "generate_text: tool loop limit reached"
    );
    let last_text = steps.last().map(|s| s.text.clone()).unwrap_or_default();
    Ok(GenerateTextResult {
        text: last_text,
        steps,
        messages,
        usage: total_usage,
        finish_reason: Some(FinishReason::Length),
    })
}

fn summarize_tool_results(results: &[AgentToolResult]) -> String {
    results
        .iter()
        .map(|r| tool_result_to_string(&r.result))
        .collect::<Vec<_>>()
        .join("\n")
}
