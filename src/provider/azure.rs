//! Azure OpenAI provider.

use async_trait::async_trait;

use crate::error::ParleyError;

use super::http::azure_headers;
use super::openai::OpenAiProvider;
use super::{ModelProvider, ProviderRequest, ProviderResponse};

/// Azure OpenAI Service provider.
pub struct AzureOpenAiProvider {
    inner: OpenAiProvider,
    deployment: String,
}

impl AzureOpenAiProvider {
    /// Create with Azure-specific endpoint.
    /// `endpoint`: e.g., "https://myresource.openai.azure.com"
    /// `deployment`: e.g., "gpt-4o"
    /// `api_version`: e.g., "2024-06-01"
    pub fn new(endpoint: String, deployment: String, api_key: String, api_version: String) -> Self {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );
        Self {
            inner: OpenAiProvider::with_endpoint(
                "azure",
                deployment.clone(),
                url,
                azure_headers(&api_key),
            ),
            deployment,
        }
    }

    /// Name the underlying model in the request body. Azure routes by
    /// deployment, so this only matters to gateways that inspect `model`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.inner = self.inner.with_model(model);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.inner = self.inner.with_client(client);
        self
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }
}

#[async_trait]
impl ModelProvider for AzureOpenAiProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ParleyError> {
        self.inner.generate_text(request).await
    }
}
