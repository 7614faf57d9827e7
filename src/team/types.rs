//! Run status and result types.

use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::message::Transcript;
use super::termination::TerminationReason;
use crate::error::ParleyError;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TeamState {
    Idle,
    Running,
    Stopped,
    Failed,
    Cancelled,
}

impl TeamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::Cancelled)
    }
}

/// Why a run ended without failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    Condition(TerminationReason),
    MaxTurns { turns: usize },
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Condition(reason) => write!(f, "{reason}"),
            Self::MaxTurns { turns } => write!(f, "turn limit of {turns} reached"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub run_id: Uuid,
    pub transcript: Transcript,
    pub stop_reason: StopReason,
}

impl TeamResult {
    /// Number of participant turns taken.
    pub fn turns(&self) -> usize {
        self.transcript.replies().count()
    }

    pub fn last_content(&self) -> Option<&str> {
        self.transcript.last().map(|m| m.content.as_str())
    }

    /// Treat a cancelled run as an error.
    pub fn into_completed(self) -> Result<Self, ParleyError> {
        match self.stop_reason {
            StopReason::Cancelled => Err(ParleyError::Cancelled),
            _ => Ok(self),
        }
    }
}
