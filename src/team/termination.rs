//! Termination predicates evaluated by the scheduler after every message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;

use super::message::{Sender, Transcript};
use crate::error::ParleyError;

/// Which kind of predicate stopped a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionKind {
    TextMention,
    MaxMessages,
    RegexMention,
    TokenUsage,
    Timeout,
    Predicate,
    SourceMatch,
}

/// Why a predicate fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReason {
    pub condition: ConditionKind,
    pub message: String,
}

impl TerminationReason {
    pub fn new(condition: ConditionKind, message: impl Into<String>) -> Self {
        Self {
            condition,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.condition, self.message)
    }
}

/// Decides whether a conversation should stop.
///
/// Evaluated once against the seed message and then once after every reply.
/// Implementations may keep private state between calls; `reset` clears it
/// for the next run.
pub trait TerminationPredicate: Send {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason>;

    fn reset(&mut self) {}

    /// True when this predicate is guaranteed to fire eventually.
    fn is_bounded(&self) -> bool {
        false
    }
}

impl<T: TerminationPredicate + ?Sized> TerminationPredicate for Box<T> {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        (**self).evaluate(transcript)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn is_bounded(&self) -> bool {
        (**self).is_bounded()
    }
}

/// Fires when the latest message contains a substring (case-sensitive).
#[derive(Debug, Clone)]
pub struct TextMention {
    target: String,
}

impl TextMention {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl TerminationPredicate for TextMention {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        let last = transcript.last()?;
        last.content.contains(&self.target).then(|| {
            TerminationReason::new(
                ConditionKind::TextMention,
                format!("Text '{}' mentioned by {}", self.target, last.sender),
            )
        })
    }
}

/// Fires once the transcript (seed included) holds `max` messages.
#[derive(Debug, Clone)]
pub struct MaxMessages {
    max: usize,
}

impl MaxMessages {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl TerminationPredicate for MaxMessages {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        (transcript.len() >= self.max).then(|| {
            TerminationReason::new(
                ConditionKind::MaxMessages,
                format!("Maximum number of messages {} reached", self.max),
            )
        })
    }

    fn is_bounded(&self) -> bool {
        true
    }
}

/// Fires when the latest message matches a regex.
#[derive(Debug, Clone)]
pub struct RegexMention {
    regex: regex::Regex,
}

impl RegexMention {
    pub fn new(pattern: &str) -> Result<Self, ParleyError> {
        let regex = regex::Regex::new(pattern)
            .map_err(|e| ParleyError::InvalidArgument(format!("Invalid stop pattern: {e}")))?;
        Ok(Self { regex })
    }
}

impl TerminationPredicate for RegexMention {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        let last = transcript.last()?;
        self.regex.is_match(&last.content).then(|| {
            TerminationReason::new(
                ConditionKind::RegexMention,
                format!("Pattern '{}' matched in message from {}", self.regex, last.sender),
            )
        })
    }
}

/// Fires once reported token usage across the transcript reaches a budget.
#[derive(Debug, Clone)]
pub struct TokenUsage {
    max_total_tokens: u64,
}

impl TokenUsage {
    pub fn new(max_total_tokens: u64) -> Self {
        Self { max_total_tokens }
    }
}

impl TerminationPredicate for TokenUsage {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        let used = u64::from(transcript.total_usage().total_tokens);
        (used >= self.max_total_tokens).then(|| {
            TerminationReason::new(
                ConditionKind::TokenUsage,
                format!("Token budget reached: {used} >= {}", self.max_total_tokens),
            )
        })
    }
}

/// Fires once wall-clock time since the first evaluation exceeds `duration`.
///
/// Only checked between turns; a slow reply is not interrupted.
#[derive(Debug, Clone)]
pub struct Timeout {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }
}

impl TerminationPredicate for Timeout {
    fn evaluate(&mut self, _transcript: &Transcript) -> Option<TerminationReason> {
        let duration = self.duration;
        let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + duration);
        (Instant::now() >= deadline).then(|| {
            TerminationReason::new(
                ConditionKind::Timeout,
                format!("Timeout of {:.1}s reached", duration.as_secs_f64()),
            )
        })
    }

    fn reset(&mut self) {
        self.deadline = None;
    }

    fn is_bounded(&self) -> bool {
        true
    }
}

/// Fires when the latest message was sent by one of the named participants.
#[derive(Debug, Clone)]
pub struct SourceMatch {
    sources: Vec<String>,
}

impl SourceMatch {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

impl TerminationPredicate for SourceMatch {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        let Sender::Participant(name) = &transcript.last()?.sender else {
            return None;
        };
        self.sources.iter().any(|s| s == name).then(|| {
            TerminationReason::new(ConditionKind::SourceMatch, format!("'{name}' answered"))
        })
    }
}

/// Fires when a custom closure returns true.
pub struct Predicate<F> {
    description: String,
    predicate: F,
}

impl<F> Predicate<F>
where
    F: FnMut(&Transcript) -> bool + Send,
{
    pub fn new(description: impl Into<String>, predicate: F) -> Self {
        Self {
            description: description.into(),
            predicate,
        }
    }
}

impl<F> TerminationPredicate for Predicate<F>
where
    F: FnMut(&Transcript) -> bool + Send,
{
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        (self.predicate)(transcript)
            .then(|| TerminationReason::new(ConditionKind::Predicate, self.description.clone()))
    }
}

/// Logical OR over an ordered list of predicates.
///
/// Every child is evaluated on every call so stateful children see each turn;
/// the reported reason is that of the first child (in declared order) that
/// fired.
#[derive(Default)]
pub struct AnyOf {
    children: Vec<Box<dyn TerminationPredicate>>,
}

impl AnyOf {
    pub fn new(children: Vec<Box<dyn TerminationPredicate>>) -> Self {
        Self { children }
    }

    /// Append another child.
    pub fn or(mut self, child: impl TerminationPredicate + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl TerminationPredicate for AnyOf {
    fn evaluate(&mut self, transcript: &Transcript) -> Option<TerminationReason> {
        let mut first = None;
        for child in &mut self.children {
            let reason = child.evaluate(transcript);
            if first.is_none() {
                first = reason;
            }
        }
        first
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
    }

    fn is_bounded(&self) -> bool {
        self.children.iter().any(|c| c.is_bounded())
    }
}

impl std::fmt::Debug for AnyOf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyOf")
            .field("children", &self.children.len())
            .finish()
    }
}
