//! parley: round-robin multi-agent conversations.
//!
//! A [`team::RoundRobinTeam`] drives an ordered list of participants through
//! turns until a composable termination predicate fires, a turn ceiling is
//! reached, or the caller cancels. Participants are usually
//! [`agent::AssistantAgent`]s backed by an OpenAI-compatible completion
//! client, optionally calling tools served over MCP.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use parley::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> parley::error::Result<()> {
//! let config = ParleyConfig::from_env();
//! let provider = parley::provider::create_provider(&config)?;
//!
//! let mut team = RoundRobinTeam::builder()
//!     .participant(AssistantAgent::new("writer", Arc::clone(&provider)))
//!     .participant(AssistantAgent::new("critic", provider))
//!     .termination(
//!         AnyOf::default()
//!             .or(TextMention::new("APPROVE"))
//!             .or(MaxMessages::new(6)),
//!     )
//!     .build()?;
//!
//! let result = team
//!     .run("Write a haiku about ownership.", &CancellationToken::new())
//!     .await?;
//! println!("stopped: {}", result.stop_reason);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod console;
pub mod error;
pub mod generation;
pub mod prelude;
pub mod provider;
pub mod team;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;
