//! The participant seam: anything that can take a turn.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::message::Transcript;
use crate::error::ParleyError;
use crate::types::Usage;

/// One participant's contribution for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub usage: Option<Usage>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A named entity that produces exactly one reply per turn.
///
/// Participants read the transcript but never modify it. They must not keep
/// per-run state that survives [`RoundRobinTeam::reset`](super::RoundRobinTeam::reset).
/// The scheduler drops the `reply` future when the run is cancelled; the
/// token is passed along for participants that want to stop cooperatively.
#[async_trait]
pub trait Participant: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn reply(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<Reply, ParleyError>;
}
