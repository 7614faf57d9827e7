//! Configuration (layered: defaults < config file < environment).
//!
//! A [`ParleyConfig`] is built once at startup and passed by reference to
//! whatever needs it. Nothing in the crate reads the process environment
//! on its own.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::{ParleyError, Result};

const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Which completion backend to talk to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    #[default]
    Azure,
    OpenAi,
}

/// Azure OpenAI deployment settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AzureSettings {
    /// e.g. `https://myresource.openai.azure.com`
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    /// Underlying model name, sent as the request's `model` field.
    pub model: Option<String>,
    pub api_version: String,
    pub api_key: Option<String>,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            model: None,
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureSettings")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// OpenAI (or OpenAI-compatible) settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// A tool server launched as a child process and spoken to over stdio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    /// The web fetch server (`uvx mcp-server-fetch`).
    pub fn fetch() -> Self {
        Self::new("fetch", "uvx", vec!["mcp-server-fetch".into()])
    }

    /// The filesystem server rooted at `root`.
    pub fn filesystem(root: impl AsRef<Path>) -> Self {
        Self::new(
            "filesystem",
            "npx",
            vec![
                "-y".into(),
                "@modelcontextprotocol/server-filesystem".into(),
                root.as_ref().display().to_string(),
            ],
        )
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParleyConfig {
    pub provider: ProviderKind,
    pub azure: AzureSettings,
    pub openai: OpenAiSettings,
    pub request_timeout_secs: u64,
    #[serde(rename = "mcp_server")]
    pub mcp_servers: Vec<McpServerConfig>,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            azure: AzureSettings::default(),
            openai: OpenAiSettings::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            mcp_servers: Vec::new(),
        }
    }
}

impl ParleyConfig {
    /// Build the full layered config.
    ///
    /// An explicit `path` must exist; without one the per-user config file
    /// is read when present. Environment variables (and `.env`) win last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Defaults overlaid with the process environment (and `.env`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ParleyError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// `<config dir>/parley/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "parley")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get("PARLEY_PROVIDER").and_then(|v| v.parse().ok()) {
            self.provider = kind;
        }

        if let Some(v) = get("AZURE_ENDPOINT") {
            self.azure.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_DEPLOYMENT") {
            self.azure.deployment = Some(v);
        }
        // MODE_NAME is the historical spelling used by older .env files.
        if let Some(v) = get("MODEL_NAME").or_else(|| get("MODE_NAME")) {
            self.azure.model = Some(v);
        }
        if let Some(v) = get("API_VERSION") {
            self.azure.api_version = v;
        }
        if let Some(v) = get("AZURE_API_KEY").or_else(|| get("API_KEY")) {
            self.azure.api_key = Some(v);
        }

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai.model = v;
        }

        if let Some(secs) = get("PARLEY_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    /// Check if the selected provider has what it needs to make a call.
    pub fn has_credentials(&self) -> bool {
        match self.provider {
            ProviderKind::Azure => {
                self.azure.api_key.is_some()
                    && self.azure.endpoint.is_some()
                    && self.azure.deployment.is_some()
            }
            ProviderKind::OpenAi => self.openai.api_key.is_some(),
        }
    }

    /// Look up a configured tool server by name.
    pub fn mcp_server(&self, name: &str) -> Option<&McpServerConfig> {
        self.mcp_servers.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_fills_azure_settings() {
        let mut config = ParleyConfig::default();
        config.apply_env(lookup(&[
            ("AZURE_ENDPOINT", "https://res.openai.azure.com"),
            ("AZURE_DEPLOYMENT", "gpt-4o-mini"),
            ("API_VERSION", "2024-10-21"),
            ("API_KEY", "secret"),
            ("MODE_NAME", "gpt-4o-mini"),
        ]));

        assert_eq!(config.provider, ProviderKind::Azure);
        assert_eq!(config.azure.endpoint.as_deref(), Some("https://res.openai.azure.com"));
        assert_eq!(config.azure.deployment.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.azure.api_version, "2024-10-21");
        assert_eq!(config.azure.api_key.as_deref(), Some("secret"));
        assert_eq!(config.azure.model.as_deref(), Some("gpt-4o-mini"));
        assert!(config.has_credentials());
    }

    #[test]
    fn model_name_wins_over_legacy_spelling() {
        let mut config = ParleyConfig::default();
        config.apply_env(lookup(&[("MODE_NAME", "old"), ("MODEL_NAME", "new")]));
        assert_eq!(config.azure.model.as_deref(), Some("new"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = ParleyConfig::default();
        config.apply_env(lookup(&[("API_VERSION", "  "), ("API_KEY", "")]));
        assert_eq!(config.azure.api_version, DEFAULT_AZURE_API_VERSION);
        assert!(config.azure.api_key.is_none());
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        let mut config = ParleyConfig::default();
        config.apply_env(lookup(&[("PARLEY_PROVIDER", "OpenAI"), ("OPENAI_API_KEY", "sk")]));
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert!(config.has_credentials());
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = ParleyConfig::default();
        config.azure.api_key = Some("super-secret".into());
        config.openai.api_key = Some("sk-also-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("sk-also-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn toml_with_mcp_servers() {
        let config = ParleyConfig::from_toml(
            r#"
            provider = "openai"
            request_timeout_secs = 30

            [openai]
            model = "gpt-4o-mini"

            [[mcp_server]]
            name = "fetch"
            command = "uvx"
            args = ["mcp-server-fetch"]
            "#,
        )
        .unwrap();

        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.mcp_server("fetch"), Some(&McpServerConfig::fetch()));
        assert!(config.mcp_server("filesystem").is_none());
    }

    #[test]
    fn bad_toml_is_a_config_file_error() {
        let err = ParleyConfig::from_toml("provider = [").unwrap_err();
        assert!(matches!(err, ParleyError::Toml(_)));
    }
}
