//! Completion client trait and implementations.

pub mod format;
pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "azure")]
pub mod azure;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ParleyConfig, ProviderKind};
use crate::error::ParleyError;
use crate::types::{AgentToolCall, FinishReason, GenerationSettings, ModelMessage, Usage};

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Response from a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub tool_calls: Vec<AgentToolCall>,
    pub finish_reason: Option<FinishReason>,
}

/// Core trait implemented by all completion clients: given the prior
/// messages, produce one new message (or fail).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai", "azure").
    fn provider_name(&self) -> &str;

    /// The model or deployment this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate one completion (non-streaming).
    async fn generate_text(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, ParleyError>;
}

/// Create the provider selected by `config`.
#[allow(unused_variables)]
pub fn create_provider(config: &ParleyConfig) -> Result<Arc<dyn ModelProvider>, ParleyError> {
    let client = http::build_client(Duration::from_secs(config.request_timeout_secs))?;

    match config.provider {
        #[cfg(feature = "azure")]
        ProviderKind::Azure => {
            let azure = &config.azure;
            let endpoint = azure
                .endpoint
                .clone()
                .ok_or_else(|| ParleyError::Configuration("Missing AZURE_ENDPOINT".into()))?;
            let deployment = azure
                .deployment
                .clone()
                .ok_or_else(|| ParleyError::Configuration("Missing AZURE_DEPLOYMENT".into()))?;
            let api_key = azure
                .api_key
                .clone()
                .ok_or_else(|| ParleyError::Authentication("Missing API_KEY".into()))?;
            let mut provider = azure::AzureOpenAiProvider::new(
                endpoint,
                deployment,
                api_key,
                azure.api_version.clone(),
            )
            .with_client(client);
            if let Some(model) = &azure.model {
                provider = provider.with_model(model.clone());
            }
            Ok(Arc::new(provider))
        }
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => {
            let api_key = config
                .openai
                .api_key
                .clone()
                .ok_or_else(|| ParleyError::Authentication("Missing OPENAI_API_KEY".into()))?;
            Ok(Arc::new(
                openai::OpenAiProvider::new(
                    config.openai.model.clone(),
                    api_key,
                    config.openai.base_url.clone(),
                )
                .with_client(client),
            ))
        }
        #[allow(unreachable_patterns)]
        other => Err(ParleyError::Configuration(format!(
            "Provider '{other}' not enabled via feature flags"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_without_endpoint_is_a_configuration_error() {
        let mut config = ParleyConfig::default();
        config.azure.api_key = Some("k".into());
        config.azure.deployment = Some("gpt-4o".into());
        let err = create_provider(&config).err().expect("endpoint is required");
        assert!(matches!(err, ParleyError::Configuration(m) if m.contains("AZURE_ENDPOINT")));
    }

    #[test]
    fn openai_without_key_is_an_authentication_error() {
        let config = ParleyConfig {
            provider: ProviderKind::OpenAi,
            ..Default::default()
        };
        let err = create_provider(&config).err().expect("key is required");
        assert!(matches!(err, ParleyError::Authentication(_)));
    }

    #[test]
    fn azure_provider_reports_deployment() {
        let mut config = ParleyConfig::default();
        config.azure.endpoint = Some("https://res.openai.azure.com".into());
        config.azure.deployment = Some("team-gpt4o".into());
        config.azure.api_key = Some("k".into());
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "azure");
        assert_eq!(provider.model_id(), "team-gpt4o");
    }
}
