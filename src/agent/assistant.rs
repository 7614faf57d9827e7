//! LLM-backed participant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ParleyError;
use crate::generation::{generate_text, GenerateOptions, GenerateTextResult};
use crate::provider::ModelProvider;
use crate::team::{Participant, Reply, Sender, Transcript};
use crate::tools::{Tool, ToolInvoker};
use crate::types::{GenerationSettings, ModelMessage};
use crate::util::timeout::with_timeout;

/// System prompt used when none is supplied.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Solve tasks using your tools. Reply with TERMINATE when the task has been completed.";

/// A participant that answers each turn with one (possibly tool-using) model
/// completion.
pub struct AssistantAgent {
    name: String,
    description: String,
    provider: Arc<dyn ModelProvider>,
    system_prompt: String,
    invoker: ToolInvoker,
    settings: GenerationSettings,
    reflect_on_tool_use: bool,
    max_tool_iterations: usize,
    turn_timeout: Option<Duration>,
}

impl AssistantAgent {
    pub fn new(name: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            name: name.into(),
            description: "An agent that provides assistance with ability to use tools.".into(),
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            invoker: ToolInvoker::empty(),
            settings: GenerationSettings::default(),
            reflect_on_tool_use: false,
            max_tool_iterations: crate::generation::text::MAX_TOOL_ITERATIONS,
            turn_timeout: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Declare the tools this agent may call. Duplicate names are rejected.
    pub fn with_tools(
        mut self,
        tools: impl IntoIterator<Item = Arc<dyn Tool>>,
    ) -> Result<Self, ParleyError> {
        self.invoker = ToolInvoker::new(tools)?;
        Ok(self)
    }

    pub fn with_invoker(mut self, invoker: ToolInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// After tools run, ask the model for a final answer instead of replying
    /// with the raw tool output.
    pub fn with_reflect_on_tool_use(mut self, reflect: bool) -> Self {
        self.reflect_on_tool_use = reflect;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    /// Fail the turn with [`ParleyError::Timeout`] if it takes longer.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Model-facing view of the transcript from this agent's point of view.
    ///
    /// The seed becomes a user message, this agent's replies become assistant
    /// messages and everyone else's become named user messages.
    pub fn render_messages(&self, transcript: &Transcript) -> Vec<ModelMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(ModelMessage::system(self.system_prompt.clone()));
        }
        for message in transcript {
            messages.push(match &message.sender {
                Sender::Task => ModelMessage::user(message.content.clone()),
                Sender::Participant(name) if *name == self.name => {
                    ModelMessage::assistant(message.content.clone())
                }
                Sender::Participant(name) => {
                    ModelMessage::user(message.content.clone()).with_name(name.clone())
                }
            });
        }
        messages
    }

    /// Answer a single prompt outside of a team.
    pub async fn ask(&self, prompt: impl Into<String>) -> Result<GenerateTextResult, ParleyError> {
        self.generate(&Transcript::seeded(prompt)).await
    }

    async fn generate(&self, transcript: &Transcript) -> Result<GenerateTextResult, ParleyError> {
        let options = GenerateOptions {
            reflect_on_tool_use: self.reflect_on_tool_use,
            max_tool_iterations: self.max_tool_iterations,
            caller: Some(self.name.clone()),
        };
        let generation = generate_text(
            self.provider.as_ref(),
            self.render_messages(transcript),
            self.settings.clone(),
            &self.invoker,
            &options,
        );
        match self.turn_timeout {
            Some(timeout) => with_timeout(timeout, generation).await,
            None => generation.await,
        }
    }
}

#[async_trait]
impl Participant for AssistantAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn reply(
        &self,
        transcript: &Transcript,
        _cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError> {
        tracing::debug!(
            agent = %self.name,
            provider = self.provider.provider_name(),
            model = self.provider.model_id(),
            "generating reply"
        );
        let result = self.generate(transcript).await?;
        let reply = Reply::text(result.text);
        Ok(if result.usage.is_empty() {
            reply
        } else {
            reply.with_usage(result.usage)
        })
    }
}

impl std::fmt::Debug for AssistantAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantAgent")
            .field("name", &self.name)
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .field("tools", &self.invoker)
            .field("reflect_on_tool_use", &self.reflect_on_tool_use)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderRequest, ProviderResponse};
    use crate::types::Role;

    struct EchoProvider;

    #[async_trait]
    impl ModelProvider for EchoProvider {
        fn provider_name(&self) -> &str {
            "echo"
        }

        fn model_id(&self) -> &str {
            "echo-1"
        }

        async fn generate_text(
            &self,
            request: &ProviderRequest,
        ) -> Result<ProviderResponse, ParleyError> {
            let last = request.messages.last().map(|m| m.text()).unwrap_or_default();
            Ok(ProviderResponse {
                text: format!("echo: {last}"),
                ..ProviderResponse::default()
            })
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl ModelProvider for SlowProvider {
        fn provider_name(&self) -> &str {
            "slow"
        }

        fn model_id(&self) -> &str {
            "slow-1"
        }

        async fn generate_text(
            &self,
            _request: &ProviderRequest,
        ) -> Result<ProviderResponse, ParleyError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ProviderResponse::default())
        }
    }

    #[test]
    fn render_maps_senders_to_roles() {
        let agent = AssistantAgent::new("ai_assistant_1", Arc::new(EchoProvider));
        let mut transcript = Transcript::seeded("Summarize the page");
        transcript.push(Sender::participant("ai_assistant_1"), "Fetching.", None);
        transcript.push(Sender::participant("ai_assistant_2"), "Done?", None);

        let messages = agent.render_messages(&transcript);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].name.as_deref(), Some("ai_assistant_2"));
        assert!(messages[1].name.is_none());
    }

    #[tokio::test]
    async fn reply_uses_latest_message() {
        let agent = AssistantAgent::new("a", Arc::new(EchoProvider)).with_system_prompt("");
        let reply = agent
            .reply(&Transcript::seeded("hello"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.content, "echo: hello");
        assert!(reply.usage.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn turn_timeout_surfaces_as_timeout_error() {
        let agent = AssistantAgent::new("slow", Arc::new(SlowProvider))
            .with_turn_timeout(Duration::from_secs(5));
        let err = agent
            .reply(&Transcript::seeded("hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Timeout(5000)));
    }
}
