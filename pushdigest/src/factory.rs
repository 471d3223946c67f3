//! Builds the stage clients from configuration, once per process.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use common::{resolve_env, Config, TransformStrategy};

use crate::llm::remote::RemoteLlmProvider;
use crate::llm::LlmProvider;
use crate::notifier::{Notifier, PushClient};
use crate::pipeline::Pipeline;
use crate::scraping::ArticleFetcher;
use crate::summarizer::text_analytics::TextAnalyticsSummarizer;
use crate::summarizer::Summarizer;
use crate::transform::{GenerativeTranslate, ServiceTranslate, StructuredExtraction, Transformer};
use crate::translator::TranslatorClient;

/// Assemble the whole pipeline. Credentials are read from the environment
/// variables named in `config`; a missing one fails here, before serving.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    if config.summarizer.max_sentence_count == 0 {
        anyhow::bail!("summarizer.max_sentence_count must be at least 1");
    }

    let fetcher = ArticleFetcher::new(&config.fetch)?;
    let summarizer = create_summarizer(config)?;
    let transformer = create_transformer(config)?;
    let notifier = create_notifier(config)?;

    info!(
        strategy = transformer.name(),
        max_sentences = config.summarizer.max_sentence_count,
        echo_source_url = config.notifier.echo_source_url,
        "pipeline initialized"
    );

    Ok(Pipeline::new(
        fetcher,
        summarizer,
        config.summarizer.max_sentence_count,
        transformer,
        notifier,
    ))
}

fn create_summarizer(config: &Config) -> Result<Arc<dyn Summarizer>> {
    let cfg = &config.summarizer;
    let endpoint = resolve_env(&cfg.endpoint_env).context("summarizer endpoint")?;
    let api_key = resolve_env(&cfg.api_key_env).context("summarizer key")?;

    let summarizer = TextAnalyticsSummarizer::new(endpoint, api_key)
        .with_api_version(cfg.api_version.clone())
        .with_language(cfg.language.clone())
        .with_polling(Duration::from_millis(cfg.poll_interval_ms), cfg.max_polls);
    Ok(Arc::new(summarizer))
}

fn create_llm_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    let cfg = &config.llm;
    let endpoint = resolve_env(&cfg.endpoint_env).context("chat completion endpoint")?;
    let api_key = resolve_env(&cfg.api_key_env).context("chat completion key")?;

    let provider = RemoteLlmProvider::azure(&endpoint, api_key, &cfg.deployment, &cfg.api_version)
        .with_defaults(cfg.timeout_seconds, cfg.max_tokens, cfg.temperature);
    info!(deployment = %cfg.deployment, "LLM provider initialized");
    Ok(Arc::new(provider))
}

/// Build the single transformer selected by `transform.strategy`.
pub fn create_transformer(config: &Config) -> Result<Arc<dyn Transformer>> {
    let language = &config.transform.target_language;
    let transformer: Arc<dyn Transformer> = match config.transform.strategy {
        TransformStrategy::GenerativeTranslate => {
            Arc::new(GenerativeTranslate::new(create_llm_provider(config)?, language))
        }
        TransformStrategy::StructuredExtraction => {
            Arc::new(StructuredExtraction::new(create_llm_provider(config)?, language))
        }
        TransformStrategy::ServiceTranslate => {
            let cfg = &config.translator;
            let endpoint = resolve_env(&cfg.endpoint_env).context("translator endpoint")?;
            let api_key = resolve_env(&cfg.api_key_env).context("translator key")?;
            let region = resolve_env(&cfg.region_env).context("translator region")?;
            let client = TranslatorClient::new(endpoint, api_key, region)
                .with_languages(cfg.from.clone(), cfg.to.clone());
            Arc::new(ServiceTranslate::new(client))
        }
    };
    Ok(transformer)
}

fn create_notifier(config: &Config) -> Result<Notifier> {
    let cfg = &config.notifier;
    let token = resolve_env(&cfg.access_token_env).context("push access token")?;
    let recipient = resolve_env(&cfg.recipient_env).context("push recipient")?;
    Ok(Notifier::new(
        PushClient::new(cfg.push_url.clone(), token, recipient),
        cfg.echo_source_url,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_fail_at_build_time() {
        let mut config = Config::default();
        config.summarizer.endpoint_env = "PUSHDIGEST_FACTORY_TEST_UNSET_ENDPOINT".to_string();
        let err = build_pipeline(&config).err().expect("build must fail");
        assert!(format!("{:#}", err).contains("PUSHDIGEST_FACTORY_TEST_UNSET_ENDPOINT"));
    }
}
