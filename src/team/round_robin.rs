//! Round-robin turn scheduler.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{TeamEvent, TeamEventSink};
use super::message::{Sender, Transcript};
use super::participant::Participant;
use super::termination::TerminationPredicate;
use super::types::{StopReason, TeamResult, TeamState};
use crate::error::ParleyError;

/// Drives an ordered list of participants in strict round-robin order.
///
/// Turn `i` (zero-based) belongs to `participants[i % n]`. After each reply
/// is appended the termination predicate is evaluated exactly once; the
/// seed message gets one evaluation before the first turn.
pub struct RoundRobinTeam {
    participants: Vec<Arc<dyn Participant>>,
    termination: Option<Box<dyn TerminationPredicate>>,
    max_turns: Option<usize>,
    event_sink: Option<TeamEventSink>,
    transcript: Transcript,
    state: TeamState,
    run_id: Option<Uuid>,
}

impl RoundRobinTeam {
    pub fn builder() -> RoundRobinTeamBuilder {
        RoundRobinTeamBuilder::default()
    }

    pub fn state(&self) -> TeamState {
        self.state
    }

    /// The transcript of the current or most recent run, including partial
    /// transcripts left behind by a failure.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn participant_names(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.name())
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    /// Clear the transcript and predicate state so the team can run again.
    pub fn reset(&mut self) {
        self.transcript.clear();
        if let Some(termination) = self.termination.as_mut() {
            termination.reset();
        }
        self.state = TeamState::Idle;
        self.run_id = None;
    }

    /// Run the conversation to completion.
    ///
    /// Returns the result for a normal stop (predicate, turn ceiling or
    /// cancellation). A participant error halts the run with
    /// [`ParleyError::ParticipantFailure`] and leaves the team in
    /// [`TeamState::Failed`].
    pub async fn run(
        &mut self,
        task: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TeamResult, ParleyError> {
        self.ensure_idle()?;

        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.state = TeamState::Running;
        self.transcript = Transcript::seeded(task);
        info!(
            %run_id,
            participants = ?self.participant_names().collect::<Vec<_>>(),
            max_turns = ?self.max_turns,
            "team run started"
        );
        if let Some(seed) = self.transcript.task() {
            self.emit(TeamEvent::Started {
                run_id,
                task: seed.clone(),
            });
        }

        if let Some(reason) = self.evaluate() {
            return Ok(self.finish(run_id, StopReason::Condition(reason)));
        }

        let mut turn = 0usize;
        loop {
            // Lets stream consumers and cancellers run between turns.
            tokio::task::yield_now().await;
            if self.max_turns.is_some_and(|max| turn >= max) {
                return Ok(self.finish(run_id, StopReason::MaxTurns { turns: turn }));
            }
            if cancel.is_cancelled() {
                return Ok(self.finish(run_id, StopReason::Cancelled));
            }

            let participant = Arc::clone(&self.participants[turn % self.participants.len()]);
            let name = participant.name().to_string();
            debug!(%run_id, turn, participant = %name, "turn started");
            self.emit(TeamEvent::TurnStarted {
                run_id,
                turn,
                participant: name.clone(),
            });

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                reply = participant.reply(&self.transcript, cancel) => Some(reply),
            };

            let reply = match outcome {
                None => {
                    debug!(%run_id, turn, participant = %name, "turn abandoned on cancellation");
                    return Ok(self.finish(run_id, StopReason::Cancelled));
                }
                Some(Ok(reply)) => reply,
                Some(Err(error)) => return Err(self.fail(run_id, name, turn, error)),
            };

            let message = self
                .transcript
                .push(Sender::Participant(name), reply.content, reply.usage)
                .clone();
            self.emit(TeamEvent::Message { run_id, message });
            turn += 1;

            if let Some(reason) = self.evaluate() {
                return Ok(self.finish(run_id, StopReason::Condition(reason)));
            }
        }
    }

    /// Run on a spawned task and stream every event.
    ///
    /// Fails up front when the team is not idle. Otherwise the stream always
    /// ends with exactly one [`TeamEvent::Finished`] or [`TeamEvent::Failed`].
    /// Dropping the stream cancels the run without touching `cancel`. Any
    /// sink configured on the builder still receives the events too.
    pub fn run_stream(
        mut self,
        task: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, TeamEvent>, ParleyError> {
        self.ensure_idle()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = cancel.child_token();
        let abandon = cancel.clone();
        let downstream = self.event_sink.take();
        self.event_sink = Some(Arc::new(move |event: TeamEvent| {
            if let Some(sink) = &downstream {
                sink(event.clone());
            }
            if tx.send(event).is_err() && !abandon.is_cancelled() {
                debug!("team event stream dropped, cancelling run");
                abandon.cancel();
            }
        }));

        let task = task.into();
        tokio::spawn(async move {
            // Participant failures already went out as `Failed`.
            let _ = self.run(task, &cancel).await;
        });

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    fn ensure_idle(&self) -> Result<(), ParleyError> {
        if self.state == TeamState::Idle {
            return Ok(());
        }
        Err(ParleyError::Configuration(format!(
            "Team is {}; call reset() before running again",
            self.state
        )))
    }

    fn evaluate(&mut self) -> Option<super::termination::TerminationReason> {
        self.termination
            .as_mut()
            .and_then(|t| t.evaluate(&self.transcript))
    }

    fn finish(&mut self, run_id: Uuid, stop_reason: StopReason) -> TeamResult {
        self.state = match stop_reason {
            StopReason::Cancelled => TeamState::Cancelled,
            _ => TeamState::Stopped,
        };
        info!(
            %run_id,
            messages = self.transcript.len(),
            reason = %stop_reason,
            "team run stopped"
        );
        let result = TeamResult {
            run_id,
            transcript: self.transcript.clone(),
            stop_reason,
        };
        self.emit(TeamEvent::Finished {
            result: result.clone(),
        });
        result
    }

    fn fail(&mut self, run_id: Uuid, participant: String, turn: usize, error: ParleyError) -> ParleyError {
        self.state = TeamState::Failed;
        warn!(%run_id, turn, participant = %participant, error = %error, "participant failed");
        self.emit(TeamEvent::Failed {
            run_id,
            participant: participant.clone(),
            turn,
            error: error.to_string(),
            category: error.category(),
            transcript: self.transcript.clone(),
        });
        ParleyError::participant(participant, turn, error)
    }

    fn emit(&self, event: TeamEvent) {
        if let Some(sink) = &self.event_sink {
            sink(event);
        }
    }
}

impl std::fmt::Debug for RoundRobinTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundRobinTeam")
            .field("participants", &self.participant_names().collect::<Vec<_>>())
            .field("max_turns", &self.max_turns)
            .field("state", &self.state)
            .field("messages", &self.transcript.len())
            .finish()
    }
}

/// Builder for [`RoundRobinTeam`].
#[derive(Default)]
pub struct RoundRobinTeamBuilder {
    participants: Vec<Arc<dyn Participant>>,
    termination: Option<Box<dyn TerminationPredicate>>,
    max_turns: Option<usize>,
    event_sink: Option<TeamEventSink>,
}

impl RoundRobinTeamBuilder {
    pub fn participant(mut self, participant: impl Participant + 'static) -> Self {
        self.participants.push(Arc::new(participant));
        self
    }

    /// Add a participant the caller keeps a handle to.
    pub fn shared_participant(mut self, participant: Arc<dyn Participant>) -> Self {
        self.participants.push(participant);
        self
    }

    pub fn participants(mut self, participants: impl IntoIterator<Item = Arc<dyn Participant>>) -> Self {
        self.participants.extend(participants);
        self
    }

    pub fn termination(mut self, termination: impl TerminationPredicate + 'static) -> Self {
        self.termination = Some(Box::new(termination));
        self
    }

    /// Hard ceiling on participant turns (the seed does not count).
    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn event_sink(mut self, sink: TeamEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Validate and build.
    ///
    /// Fails when there are no participants, when two share a name, or when
    /// nothing guarantees the run ends (no turn ceiling and no bounded
    /// predicate).
    pub fn build(self) -> Result<RoundRobinTeam, ParleyError> {
        if self.participants.is_empty() {
            return Err(ParleyError::Configuration(
                "A team needs at least one participant".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.name()) {
                return Err(ParleyError::Configuration(format!(
                    "Participant name '{}' is used more than once",
                    participant.name()
                )));
            }
        }

        if self.max_turns == Some(0) {
            return Err(ParleyError::Configuration(
                "max_turns must be at least 1".into(),
            ));
        }

        let bounded = self.max_turns.is_some()
            || self.termination.as_ref().is_some_and(|t| t.is_bounded());
        if !bounded {
            return Err(ParleyError::Configuration(
                "Run is unbounded: set max_turns or add a MaxMessages or Timeout condition".into(),
            ));
        }

        Ok(RoundRobinTeam {
            participants: self.participants,
            termination: self.termination,
            max_turns: self.max_turns,
            event_sink: self.event_sink,
            transcript: Transcript::new(),
            state: TeamState::Idle,
            run_id: None,
        })
    }
}
