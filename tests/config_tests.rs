//! Config file loading and environment layering.

use std::io::Write;

use pretty_assertions::assert_eq;

use parley::config::{McpServerConfig, ParleyConfig, ProviderKind};
use parley::error::ParleyError;

const FILE: &str = r#"
provider = "azure"

[azure]
endpoint = "https://from-file.openai.azure.com"
deployment = "file-deployment"
api_key = "file-key"

[[mcp_server]]
name = "filesystem"
command = "npx"
args = ["-y", "@modelcontextprotocol/server-filesystem", "/srv/task"]

[mcp_server.env]
NODE_ENV = "production"
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_values_are_loaded() {
    let file = write_config(FILE);
    let config = ParleyConfig::from_file(file.path()).unwrap();

    assert_eq!(config.provider, ProviderKind::Azure);
    assert_eq!(
        config.azure.endpoint.as_deref(),
        Some("https://from-file.openai.azure.com")
    );
    assert_eq!(config.azure.api_version, "2024-06-01");
    assert!(config.has_credentials());

    let fs = config.mcp_server("filesystem").unwrap();
    assert_eq!(fs.command, "npx");
    assert_eq!(fs.args.last().map(String::as_str), Some("/srv/task"));
    assert_eq!(fs.env.get("NODE_ENV").map(String::as_str), Some("production"));
}

#[test]
fn environment_overrides_file() {
    let file = write_config(FILE);
    let mut config = ParleyConfig::from_file(file.path()).unwrap();
    config.apply_env(|key| match key {
        "AZURE_DEPLOYMENT" => Some("env-deployment".to_string()),
        "API_KEY" => Some("env-key".to_string()),
        "MODE_NAME" => Some("gpt-4o".to_string()),
        _ => None,
    });

    assert_eq!(config.azure.deployment.as_deref(), Some("env-deployment"));
    assert_eq!(config.azure.api_key.as_deref(), Some("env-key"));
    assert_eq!(config.azure.model.as_deref(), Some("gpt-4o"));
    assert_eq!(
        config.azure.endpoint.as_deref(),
        Some("https://from-file.openai.azure.com")
    );
}

#[test]
fn missing_explicit_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ParleyConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ParleyError::Configuration(m) if m.contains("absent.toml")));
}

#[test]
fn malformed_file_is_reported() {
    let file = write_config("[azure\nendpoint = 1");
    let err = ParleyConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ParleyError::Toml(_)));
    assert_eq!(err.category(), parley::error::ErrorCategory::Configuration);
}

#[test]
fn debug_never_prints_keys() {
    let file = write_config(FILE);
    let config = ParleyConfig::from_file(file.path()).unwrap();
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("file-key"));
    assert!(rendered.contains("file-deployment"));
}

#[test]
fn default_tool_servers() {
    let fetch = McpServerConfig::fetch();
    assert_eq!(fetch.command, "uvx");
    assert_eq!(fetch.args, vec!["mcp-server-fetch".to_string()]);

    let fs = McpServerConfig::filesystem("/tmp/task");
    assert_eq!(fs.name, "filesystem");
    assert_eq!(fs.args.last().map(String::as_str), Some("/tmp/task"));
}
