use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Client for the Azure Translator v3 `translate` endpoint.
pub struct TranslatorClient {
    endpoint: String,
    api_key: String,
    region: String,
    from: String,
    to: String,
    client: reqwest::Client,
}

/// One entry per submitted text
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationResult {
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Translation {
    pub text: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
struct TranslateItem<'a> {
    text: &'a str,
}

impl TranslatorClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            region: region.into(),
            from: "en".to_string(),
            to: "ja".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_languages(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    /// Translate `text`; every call carries a fresh `X-ClientTraceId`.
    pub async fn translate(&self, text: &str) -> Result<Vec<TranslationResult>> {
        let url = format!("{}/translate", self.endpoint);
        let trace_id = Uuid::new_v4().to_string();

        let response = self
            .client
            .post(&url)
            .query(&[
                ("api-version", "3.0"),
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
            ])
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .header("X-ClientTraceId", &trace_id)
            .json(&[TranslateItem { text }])
            .send()
            .await
            .context("translation HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("translation API error {} (trace {}): {}", status, trace_id, body);
        }

        let results: Vec<TranslationResult> = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        debug!(%trace_id, entries = results.len(), "translation received");
        Ok(results)
    }
}

/// Concatenate every translated fragment across every result entry, in order.
pub fn joined_text(results: &[TranslationResult]) -> String {
    results
        .iter()
        .flat_map(|r| r.translations.iter())
        .map(|t| t.text.as_str())
        .collect()
}
