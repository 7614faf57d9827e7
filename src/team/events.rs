//! Team run events.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::message::{Message, Transcript};
use super::types::TeamResult;
use crate::error::ErrorCategory;

/// Observational events emitted while a team runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamEvent {
    /// The seed message was recorded.
    Started { run_id: Uuid, task: Message },
    /// A participant was asked for its reply.
    TurnStarted {
        run_id: Uuid,
        turn: usize,
        participant: String,
    },
    /// A message was appended to the transcript.
    Message { run_id: Uuid, message: Message },
    /// The run stopped normally (condition, ceiling or cancellation).
    Finished { result: TeamResult },
    /// A participant failed; the run halted.
    Failed {
        run_id: Uuid,
        participant: String,
        turn: usize,
        error: String,
        category: ErrorCategory,
        transcript: Transcript,
    },
}

impl TeamEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Started { run_id, .. }
            | Self::TurnStarted { run_id, .. }
            | Self::Message { run_id, .. }
            | Self::Failed { run_id, .. } => *run_id,
            Self::Finished { result } => result.run_id,
        }
    }

    /// True for the event that closes a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }
}

/// Callback receiving every [`TeamEvent`] synchronously.
pub type TeamEventSink = Arc<dyn Fn(TeamEvent) + Send + Sync>;
