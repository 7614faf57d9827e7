//! Plain-text transcript renderer.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::ParleyError;
use crate::team::{Message, TeamEvent, TeamEventSink, TeamResult};

/// Prints team events as they happen.
///
/// Each message is written as a `---------- <sender> ----------` header
/// followed by its content; a summary block closes the run.
pub struct Console<W: Write> {
    out: W,
    show_usage: bool,
    started_at: Option<Instant>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            show_usage: true,
            started_at: None,
        }
    }

    /// Print per-message and total token counts (on by default).
    pub fn with_usage(mut self, show: bool) -> Self {
        self.show_usage = show;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one event.
    pub fn render_event(&mut self, event: &TeamEvent) -> std::io::Result<()> {
        match event {
            TeamEvent::Started { task, .. } => {
                self.started_at = Some(Instant::now());
                self.write_message(task)
            }
            TeamEvent::TurnStarted { .. } => Ok(()),
            TeamEvent::Message { message, .. } => self.write_message(message),
            TeamEvent::Finished { result } => self.write_summary(result),
            TeamEvent::Failed {
                participant,
                turn,
                error,
                category,
                transcript,
                ..
            } => {
                writeln!(self.out, "---------- error ----------")?;
                writeln!(
                    self.out,
                    "{participant} failed on turn {turn} ({category}): {error}"
                )?;
                writeln!(self.out, "Messages before failure: {}", transcript.len())?;
                self.out.flush()
            }
        }
    }

    /// Drain a [`RoundRobinTeam::run_stream`](crate::team::RoundRobinTeam::run_stream)
    /// stream, rendering as it goes.
    ///
    /// Returns the final result, or a [`ParleyError::ParticipantFailure`]
    /// carrying the failure text when the run failed.
    pub async fn render_stream(
        &mut self,
        mut stream: BoxStream<'_, TeamEvent>,
    ) -> Result<TeamResult, ParleyError> {
        while let Some(event) = stream.next().await {
            self.render_event(&event)?;
            match event {
                TeamEvent::Finished { result } => return Ok(result),
                TeamEvent::Failed {
                    participant,
                    turn,
                    error,
                    ..
                } => {
                    return Err(ParleyError::participant(
                        participant,
                        turn,
                        ParleyError::Stream(error),
                    ))
                }
                _ => {}
            }
        }
        Err(ParleyError::Stream(
            "Team event stream ended before the run finished".into(),
        ))
    }

    fn write_message(&mut self, message: &Message) -> std::io::Result<()> {
        writeln!(self.out, "---------- {} ----------", message.sender)?;
        writeln!(self.out, "{}", message.content)?;
        if self.show_usage {
            if let Some(usage) = message.usage {
                writeln!(
                    self.out,
                    "[Prompt tokens: {}, Completion tokens: {}]",
                    usage.input_tokens, usage.output_tokens
                )?;
            }
        }
        self.out.flush()
    }

    fn write_summary(&mut self, result: &TeamResult) -> std::io::Result<()> {
        writeln!(self.out, "---------- Summary ----------")?;
        writeln!(self.out, "Number of messages: {}", result.transcript.len())?;
        writeln!(self.out, "Finish reason: {}", result.stop_reason)?;
        if self.show_usage {
            let usage = result.transcript.total_usage();
            writeln!(self.out, "Total prompt tokens: {}", usage.input_tokens)?;
            writeln!(self.out, "Total completion tokens: {}", usage.output_tokens)?;
        }
        if let Some(started_at) = self.started_at {
            writeln!(
                self.out,
                "Duration: {:.2} seconds",
                started_at.elapsed().as_secs_f64()
            )?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> Console<W> {
    /// Wrap the console as an event sink for [`RoundRobinTeam::run`](crate::team::RoundRobinTeam::run).
    pub fn into_sink(self) -> TeamEventSink {
        let console = Arc::new(Mutex::new(self));
        Arc::new(move |event: TeamEvent| {
            if let Ok(mut console) = console.lock() {
                if let Err(e) = console.render_event(&event) {
                    tracing::warn!(error = %e, "failed to render team event");
                }
            }
        })
    }
}
