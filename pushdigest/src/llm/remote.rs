use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// How the provider authenticates its requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStyle {
    /// `Authorization: Bearer <key>` (OpenAI and compatible servers)
    Bearer,
    /// `api-key: <key>` (Azure OpenAI deployments)
    ApiKeyHeader,
}

/// Remote LLM provider using an OpenAI-compatible chat-completions HTTP API
pub struct RemoteLlmProvider {
    url: String,
    api_key: String,
    model: String,
    auth: AuthStyle,
    default_timeout: Option<Duration>,
    default_max_tokens: Option<usize>,
    default_temperature: Option<f32>,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    /// Provider posting to `url` with bearer authorization.
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            auth: AuthStyle::Bearer,
            default_timeout: None,
            default_max_tokens: None,
            default_temperature: None,
            client: reqwest::Client::new(),
        }
    }

    /// Provider for an Azure OpenAI deployment.
    ///
    /// Requests go to `{endpoint}/openai/deployments/{deployment}/chat/completions`
    /// and authenticate with the `api-key` header.
    pub fn azure(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: &str,
        api_version: &str,
    ) -> Self {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );
        let mut provider = Self::new(url, api_key, deployment);
        provider.auth = AuthStyle::ApiKeyHeader;
        provider
    }

    /// Without a timeout the exchange waits as long as the HTTP client does.
    pub fn with_defaults(
        mut self,
        timeout_secs: Option<u64>,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> Self {
        self.default_timeout = timeout_secs.map(Duration::from_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.default_timeout
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .or(self.default_timeout);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(Message {
                role: "system".to_string(),
                content: Some(system),
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: Some(request.prompt),
        });

        let req_body = OpenAiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens.or(self.default_max_tokens),
            temperature: request.temperature.or(self.default_temperature),
        };

        let builder = self.client.post(&self.url).json(&req_body);
        let builder = match self.auth {
            AuthStyle::Bearer => builder.bearer_auth(&self.api_key),
            AuthStyle::ApiKeyHeader => builder.header("api-key", &self.api_key),
        };

        // The timeout covers the whole exchange, body included
        let exchange = async {
            let response = builder.send().await.context("LLM HTTP request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("LLM API error {}: {}", status, body);
            }

            response
                .json::<OpenAiResponse>()
                .await
                .context("Failed to parse LLM response")
        };

        let resp_body = match timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .context("LLM request timed out")??,
            None => exchange.await?,
        };

        let choice = resp_body
            .choices
            .into_iter()
            .next()
            .context("LLM response has no choices")?;

        let content = choice
            .message
            .content
            .context("LLM response choice has no content")?;

        let usage = resp_body
            .usage
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens.unwrap_or(0),
                completion_tokens: u.completion_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        debug!(total_tokens = usage.total_tokens, "LLM completion received");

        Ok(LlmResponse {
            content,
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}
