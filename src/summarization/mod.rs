//! Abstractions for generating summaries via hosted chat-completion models.
//!
//! The pipeline assembles the instruction prompt; providers only relay a system framing and a
//! user prompt and return the model's answer. The Azure OpenAI adapter issues HTTP requests
//! directly against the deployment's chat completions route.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

/// Errors surfaced while attempting summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or the request timed out.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary ({status}): {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_) => true,
            Self::GenerationFailed { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// System-role framing for the model.
    pub system: String,
    /// Prompt assembled by the pipeline, document text included.
    pub prompt: String,
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate a summary for the request, trimmed of surrounding whitespace.
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Connection settings for an Azure OpenAI chat deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAiSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// Resource API key.
    pub api_key: String,
    /// Deployment name of the chat model.
    pub deployment: String,
    /// REST API version.
    pub api_version: String,
}

/// Chat completions client for an Azure OpenAI deployment.
pub struct AzureOpenAiSummarizer {
    http: Client,
    settings: AzureOpenAiSettings,
}

impl AzureOpenAiSummarizer {
    /// Build a client for the configured deployment.
    pub fn new(settings: AzureOpenAiSettings) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("lexsum/summary")
            .build()
            .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment,
            self.settings.api_version
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Summarizer for AzureOpenAiSummarizer {
    async fn summarize(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("api-key", &self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach deployment {}: {error}",
                    self.settings.deployment
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed { status, body });
        }

        let body: ChatCompletion = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode chat completion: {error}"
            ))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SummarizationClientError::InvalidResponse("completion carried no content".into())
            })?;

        Ok(content.trim().to_string())
    }
}
