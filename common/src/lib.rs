/*!
common/src/lib.rs

Shared configuration types for pushdigest.

This file provides:
- Config data structures (deserialized from TOML, every section defaulted)
- An async loader that merges a default and an override TOML file
- Helpers to resolve secrets from the environment variables named in the config
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7071,
        }
    }
}

/// Article fetching configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// None keeps the HTTP client's default behaviour
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

/// Extractive summarization service (Azure AI Language)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub endpoint_env: String,
    pub api_key_env: String,
    pub api_version: String,
    /// Language hint sent with the single submitted document
    pub language: String,
    pub max_sentence_count: usize,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint_env: "TEXT_ANALYTICS_ENDPOINT".to_string(),
            api_key_env: "TEXT_ANALYTICS_KEY".to_string(),
            api_version: "2023-04-01".to_string(),
            language: "en".to_string(),
            max_sentence_count: 4,
            poll_interval_ms: 1000,
            max_polls: 120,
        }
    }
}

/// Which transformation runs after summarization. One per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStrategy {
    /// Chat model translates the summary and formats it as a bullet list
    GenerativeTranslate,
    /// Dedicated machine translation service
    ServiceTranslate,
    /// Two chat calls extracting title/features and explanation/importance
    StructuredExtraction,
}

impl TransformStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformStrategy::GenerativeTranslate => "generative_translate",
            TransformStrategy::ServiceTranslate => "service_translate",
            TransformStrategy::StructuredExtraction => "structured_extraction",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub strategy: TransformStrategy,
    /// Human readable language name used in chat prompts
    pub target_language: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            strategy: TransformStrategy::GenerativeTranslate,
            target_language: "Japanese".to_string(),
        }
    }
}

/// Azure OpenAI chat-completion deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint_env: String,
    pub api_key_env: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint_env: "AZURE_OPENAI_ENDPOINT".to_string(),
            api_key_env: "AZURE_OPENAI_API_KEY".to_string(),
            deployment: "AzAITextSummarizeGPT".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            timeout_seconds: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Azure Translator (v3) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub endpoint_env: String,
    pub api_key_env: String,
    pub region_env: String,
    pub from: String,
    pub to: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint_env: "TRANSLATOR_ENDPOINT".to_string(),
            api_key_env: "TRANSLATOR_KEY".to_string(),
            region_env: "TRANSLATOR_REGION".to_string(),
            from: "en".to_string(),
            to: "ja".to_string(),
        }
    }
}

/// Push-messaging (LINE Messaging API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub push_url: String,
    pub access_token_env: String,
    pub recipient_env: String,
    /// Push the source URL as its own message before the summary
    pub echo_source_url: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            push_url: "https://api.line.me/v2/bot/message/push".to_string(),
            access_token_env: "LINE_CHANNEL_ACCESS_TOKEN".to_string(),
            recipient_env: "LINE_ID".to_string(),
            echo_source_url: false,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub summarizer: SummarizerConfig,
    pub transform: TransformConfig,
    pub llm: LlmConfig,
    pub translator: TranslatorConfig,
    pub notifier: NotifierConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence). Missing files
    /// are skipped, so with neither present the built-in defaults are returned.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a required value from the environment variable `name`.
///
/// Missing and empty variables are both errors; the message names the variable
/// but never echoes any value.
pub fn resolve_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("environment variable '{}' not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("environment variable '{}' is empty", name);
    }
    Ok(value)
}
