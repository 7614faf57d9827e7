//! Conversation records: senders, messages and the append-only transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Who produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Implicit sender of the seed message.
    Task,
    Participant(String),
}

impl Sender {
    pub fn participant(name: impl Into<String>) -> Self {
        Self::Participant(name.into())
    }

    /// Display name; the seed message is attributed to `task`.
    pub fn name(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Participant(name) => name,
        }
    }

    pub fn is_participant(&self, name: &str) -> bool {
        matches!(self, Self::Participant(n) if n == name)
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One immutable entry in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    /// Zero-based position in the transcript.
    pub ordinal: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only message history.
///
/// Only the scheduler appends; everyone else sees `&Transcript`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transcript holding only the seed message.
    pub fn seeded(task: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Sender::Task, task, None);
        transcript
    }

    pub(crate) fn push(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
        usage: Option<Usage>,
    ) -> &Message {
        let ordinal = self.messages.len();
        self.messages.push(Message {
            sender,
            content: content.into(),
            ordinal,
            usage,
            timestamp: Utc::now(),
        });
        &self.messages[ordinal]
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, ordinal: usize) -> Option<&Message> {
        self.messages.get(ordinal)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The seed message, if the run has started.
    pub fn task(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.sender == Sender::Task)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Messages produced by participants (everything except the seed).
    pub fn replies(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| matches!(m.sender, Sender::Participant(_)))
    }

    /// Token usage summed over every message that reported it.
    pub fn total_usage(&self) -> Usage {
        let mut total = Usage::default();
        for usage in self.messages.iter().filter_map(|m| m.usage.as_ref()) {
            total.merge(usage);
        }
        total
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
