//! Round-robin multi-participant conversations with composable termination.

pub mod events;
pub mod message;
pub mod participant;
pub mod round_robin;
pub mod termination;
pub mod types;

pub use events::{TeamEvent, TeamEventSink};
pub use message::{Message, Sender, Transcript};
pub use participant::{Participant, Reply};
pub use round_robin::{RoundRobinTeam, RoundRobinTeamBuilder};
pub use termination::{
    AnyOf, ConditionKind, MaxMessages, Predicate, RegexMention, SourceMatch, TerminationPredicate,
    TerminationReason, TextMention, Timeout, TokenUsage,
};
pub use types::{StopReason, TeamResult, TeamState};
