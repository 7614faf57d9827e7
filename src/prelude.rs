//! Convenience re-exports for common use.

pub use crate::agent::{AssistantAgent, UserProxyAgent};
pub use crate::config::{McpServerConfig, ParleyConfig};
pub use crate::console::Console;
pub use crate::error::{ParleyError, Result};
pub use crate::provider::ModelProvider;
pub use crate::team::{
    AnyOf, MaxMessages, Participant, Reply, RoundRobinTeam, StopReason, TeamEvent, TeamResult,
    TerminationPredicate, TextMention, Transcript,
};
pub use crate::tools::{FnTool, ParamKind, Tool, ToolArguments, ToolInvoker, ToolSchema};
pub use crate::types::{GenerationSettings, ModelMessage, Role, Usage};
