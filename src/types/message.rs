//! Model-facing chat messages.
//!
//! These are what a completion client sees. The team transcript lives in
//! [`crate::team::Transcript`] and is rendered into these per participant.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// What a message carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    /// An assistant turn that asked for tools, optionally with some prose.
    ToolCalls { text: String, calls: Vec<AgentToolCall> },
    ToolResult(AgentToolResult),
}

/// One message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    /// Speaker name, so participants sharing the user role stay distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub body: MessageBody,
}

impl ModelMessage {
    fn text_message(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            body: MessageBody::Text { text: text.into() },
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text_message(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text_message(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text_message(Role::Assistant, text)
    }

    /// Assistant message requesting tool calls.
    pub fn assistant_tool_calls(text: impl Into<String>, calls: &[AgentToolCall]) -> Self {
        Self {
            role: Role::Assistant,
            name: None,
            body: MessageBody::ToolCalls {
                text: text.into(),
                calls: calls.to_vec(),
            },
        }
    }

    /// Output of one tool call, answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        result: serde_json::Value,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::Tool,
            name: None,
            body: MessageBody::ToolResult(AgentToolResult {
                tool_call_id: tool_call_id.into(),
                result,
                is_error,
            }),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Prose content; empty for tool results.
    pub fn text(&self) -> &str {
        match &self.body {
            MessageBody::Text { text } | MessageBody::ToolCalls { text, .. } => text,
            MessageBody::ToolResult(_) => "",
        }
    }

    pub fn tool_calls(&self) -> &[AgentToolCall] {
        match &self.body {
            MessageBody::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The outcome of running one [`AgentToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentToolResult {
    pub tool_call_id: String,
    pub result: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_message_keeps_prose_and_calls() {
        let call = AgentToolCall {
            id: "call_1".into(),
            name: "fetch".into(),
            arguments: serde_json::json!({"url": "https://example.com"}),
        };
        let msg = ModelMessage::assistant_tool_calls("", std::slice::from_ref(&call));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls(), &[call][..]);
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn tool_result_has_no_text() {
        let msg = ModelMessage::tool_result("call_1", serde_json::json!("ok"), false);
        assert_eq!(msg.role, Role::Tool);
        assert!(msg.text().is_empty());
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn with_name_sets_speaker() {
        let msg = ModelMessage::user("hi").with_name("ai_assistant_2");
        assert_eq!(msg.name.as_deref(), Some("ai_assistant_2"));
        assert_eq!(msg.role.to_string(), "user");
    }
}
