//! Ready-made participants.

pub mod assistant;
pub mod user_proxy;

pub use assistant::{AssistantAgent, DEFAULT_SYSTEM_PROMPT};
pub use user_proxy::{HumanInput, StdinInput, UserProxyAgent};
