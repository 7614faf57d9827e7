//! Error classification and recovery hints.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    ToolExecution,
    Cancelled,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    CheckConnectivity,
    IncreaseTimeout,
    CheckToolServer,
    None,
}

impl RecoverySuggestion {
    /// One-line hint suitable for a terminal.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RetryWithBackoff => Some("the service is busy or flaky; try again shortly"),
            Self::CheckCredentials => Some(
                "check API_KEY / OPENAI_API_KEY and that the key belongs to the configured endpoint",
            ),
            Self::CheckConfiguration => {
                Some("check AZURE_ENDPOINT, AZURE_DEPLOYMENT, API_VERSION and the config file")
            }
            Self::CheckConnectivity => Some("check network access to the completion endpoint"),
            Self::IncreaseTimeout => Some("the request timed out; raise request_timeout_secs"),
            Self::CheckToolServer => {
                Some("a tool server failed; check that its command is installed and on PATH")
            }
            Self::None => None,
        }
    }
}
