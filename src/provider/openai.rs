//! OpenAI Chat Completions API provider.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::ParleyError;
use crate::types::*;

use super::format::{sanitize_speaker_name, tool_result_to_string};
use super::http::{bearer_headers, status_to_error};
use super::{ModelProvider, ProviderRequest, ProviderResponse, ToolDefinition};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    provider_name: &'static str,
    model: String,
    url: String,
    headers: HeaderMap,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(model: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            provider_name: "openai",
            model: model.into(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers: bearer_headers(&api_key),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a fully-formed completions URL with custom auth headers.
    pub(crate) fn with_endpoint(
        provider_name: &'static str,
        model: impl Into<String>,
        url: String,
        headers: HeaderMap,
    ) -> Self {
        Self {
            provider_name,
            model: model.into(),
            url,
            headers,
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, pooling).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Value sent as the request body's `model` field.
    pub(crate) fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let messages = request
            .messages
            .iter()
            .map(message_to_openai)
            .collect::<Vec<_>>();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(obj) = body.as_object_mut() {
            obj.extend(request.settings.to_request_fields());
            if let Some(tools) = request.tools.as_deref().filter(|t| !t.is_empty()) {
                obj.insert("tools".into(), tools.iter().map(tool_to_openai).collect());
            }
        }

        body
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ParleyError> {
        let body = self.build_request_body(request);

        debug!(
            provider = self.provider_name,
            model = %self.model,
            messages = request.messages.len(),
            "chat completion request"
        );

        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ParleyError::api(status, "No choices in completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| AgentToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            usage: data
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            tool_calls,
            finish_reason: choice.finish_reason.as_deref().and_then(|r| r.parse().ok()),
        })
    }
}

fn tool_to_openai(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn message_to_openai(msg: &ModelMessage) -> serde_json::Value {
    let mut out = match &msg.body {
        MessageBody::Text { text } => serde_json::json!({
            "role": msg.role.to_string(),
            "content": text,
        }),
        MessageBody::ToolCalls { text, calls } => serde_json::json!({
            "role": msg.role.to_string(),
            "content": if text.is_empty() { None } else { Some(text) },
            "tool_calls": calls.iter().map(tool_call_to_openai).collect::<Vec<_>>(),
        }),
        MessageBody::ToolResult(result) => {
            return serde_json::json!({
                "role": "tool",
                "tool_call_id": result.tool_call_id,
                "content": tool_result_to_string(&result.result),
            })
        }
    };

    if let Some(name) = msg.name.as_deref() {
        if matches!(msg.role, Role::User | Role::Assistant) {
            out["name"] = sanitize_speaker_name(name).into();
        }
    }
    out
}

/// Chat Completions wants arguments as a JSON-encoded string.
fn tool_call_to_openai(call: &AgentToolCall) -> serde_json::Value {
    serde_json::json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": call.arguments.to_string(),
        }
    })
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_user_message_carries_sanitized_name() {
        let msg = ModelMessage::user("hello").with_name("ai assistant");
        let json = message_to_openai(&msg);
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["name"], "ai_assistant");
    }

    #[test]
    fn tool_result_becomes_tool_role() {
        let msg = ModelMessage::tool_result("call_9", serde_json::json!("page text"), false);
        let json = message_to_openai(&msg);
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_9");
        assert_eq!(json["content"], "page text");
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_string() {
        let call = AgentToolCall {
            id: "call_1".into(),
            name: "fetch".into(),
            arguments: serde_json::json!({"url": "https://example.com"}),
        };
        let msg = ModelMessage::assistant_tool_calls("", &[call]);
        let json = message_to_openai(&msg);
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["function"]["name"], "fetch");
        assert_eq!(
            json["tool_calls"][0]["function"]["arguments"],
            r#"{"url":"https://example.com"}"#
        );
    }

    #[test]
    fn request_body_includes_tools_and_settings() {
        let provider = OpenAiProvider::new("gpt-4o", "sk".into(), None);
        let request = ProviderRequest {
            messages: vec![ModelMessage::user("hi")],
            settings: GenerationSettings::builder().temperature(0.2).max_tokens(64).build(),
            tools: Some(vec![ToolDefinition {
                name: "write_file".into(),
                description: "write".into(),
                parameters: serde_json::json!({"type": "object"}),
            }]),
        };
        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["tools"][0]["function"]["name"], "write_file");
        assert_eq!(provider.url(), "https://api.openai.com/v1/chat/completions");
    }
}
