//! Shared test helpers: a mock provider and scripted participants.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use parley::error::ParleyError;
use parley::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use parley::team::{Participant, Reply, TeamEvent, TeamEventSink, Transcript};
use parley::types::*;

/// A mock provider that returns canned responses and records every request.
pub struct MockProvider {
    model_id: String,
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: text.to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            tool_calls: vec![],
            finish_reason: Some(FinishReason::Stop),
        });
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push_back(ProviderResponse {
            text: String::new(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            tool_calls: vec![AgentToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: Some(FinishReason::ToolCalls),
        });
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ParleyError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ParleyError::Stream("No more mock responses".into()))
    }
}

/// Replies with `<name>: turn <k>` where `k` counts this participant's turns,
/// or with queued lines first when any are scripted.
pub struct ScriptedParticipant {
    name: String,
    script: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedParticipant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn with_lines(name: &str, lines: &[&str]) -> Self {
        let participant = Self::new(name);
        participant
            .script
            .lock()
            .unwrap()
            .extend(lines.iter().map(|l| l.to_string()));
        participant
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Participant for ScriptedParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(
        &self,
        _transcript: &Transcript,
        _cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError> {
        let turn = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let line = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("{}: turn {turn}", self.name));
        Ok(Reply::text(line))
    }
}

/// Fails every turn with the given error factory.
pub struct FailingParticipant {
    name: String,
    error: fn() -> ParleyError,
}

impl FailingParticipant {
    pub fn new(name: &str, error: fn() -> ParleyError) -> Self {
        Self {
            name: name.to_string(),
            error,
        }
    }
}

#[async_trait]
impl Participant for FailingParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(
        &self,
        _transcript: &Transcript,
        _cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError> {
        Err((self.error)())
    }
}

/// Never answers; used to exercise cancellation mid-turn.
pub struct StalledParticipant {
    name: String,
}

impl StalledParticipant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Participant for StalledParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(
        &self,
        _transcript: &Transcript,
        _cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError> {
        std::future::pending::<()>().await;
        unreachable!("pending never resolves")
    }
}

/// Event sink that records everything it sees.
pub fn recording_sink() -> (TeamEventSink, Arc<Mutex<Vec<TeamEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&events);
    let sink: TeamEventSink = Arc::new(move |event| captured.lock().unwrap().push(event));
    (sink, events)
}
