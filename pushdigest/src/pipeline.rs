//! Request orchestration: fetch -> summarize -> transform -> notify.
//!
//! Stages run strictly one after another and the first failing stage stops
//! the run. Root causes are logged here; callers only see the stage.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::notifier::Notifier;
use crate::scraping::ArticleFetcher;
use crate::summarizer::Summarizer;
use crate::transform::{TransformInput, Transformer};

/// Progress of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Fetched,
    Summarized,
    Transformed,
    Notified,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Fetched => "fetched",
            Stage::Summarized => "summarized",
            Stage::Transformed => "transformed",
            Stage::Notified => "notified",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request has no url")]
    MissingUrl,

    #[error("failed to extract text: {0:#}")]
    Extract(anyhow::Error),

    #[error("failed to summarize text: {0:#}")]
    Summarize(anyhow::Error),

    #[error("failed to transform summary: {0:#}")]
    Transform(anyhow::Error),

    #[error("failed to push message: {0:#}")]
    Notify(anyhow::Error),
}

impl PipelineError {
    /// Last stage reached before the failure
    pub fn reached(&self) -> Stage {
        match self {
            PipelineError::MissingUrl | PipelineError::Extract(_) => Stage::Start,
            PipelineError::Summarize(_) => Stage::Fetched,
            PipelineError::Transform(_) => Stage::Summarized,
            PipelineError::Notify(_) => Stage::Transformed,
        }
    }

    /// HTTP status code reported to the caller
    pub fn status(&self) -> u16 {
        match self {
            PipelineError::MissingUrl => 400,
            _ => 500,
        }
    }

    /// Message reported to the caller; never includes the root cause
    pub fn public_message(&self) -> &'static str {
        match self {
            PipelineError::MissingUrl => "Please provide a URL in the request body.",
            PipelineError::Extract(_) => "Failed to extract text from the provided URL.",
            PipelineError::Summarize(_) | PipelineError::Transform(_) => {
                "Failed to generate translated summary."
            }
            PipelineError::Notify(_) => GENERIC_ERROR_MESSAGE,
        }
    }
}

/// Body of every 500 that does not come from a known stage failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// All stage clients, built once at startup and shared between requests.
pub struct Pipeline {
    fetcher: ArticleFetcher,
    summarizer: Arc<dyn Summarizer>,
    max_sentences: usize,
    transformer: Arc<dyn Transformer>,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(
        fetcher: ArticleFetcher,
        summarizer: Arc<dyn Summarizer>,
        max_sentences: usize,
        transformer: Arc<dyn Transformer>,
        notifier: Notifier,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            max_sentences,
            transformer,
            notifier,
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.transformer.name()
    }

    pub fn max_sentences(&self) -> usize {
        self.max_sentences
    }

    pub fn echoes_source_url(&self) -> bool {
        self.notifier.echoes_source_url()
    }

    /// Fetch, summarize and transform `url` without notifying anyone.
    #[instrument(level = "info", skip(self), fields(strategy = self.transformer.name()))]
    pub async fn prepare(&self, url: &str) -> Result<String, PipelineError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PipelineError::MissingUrl);
        }

        let text = self
            .fetcher
            .fetch_text(url)
            .await
            .map_err(|e| log_failure(PipelineError::Extract(e)))?;
        info!(stage = %Stage::Fetched, chars = text.len());

        let input = match self.transformer.input() {
            TransformInput::Summary => {
                let summary = self
                    .summarizer
                    .summarize(&text, self.max_sentences)
                    .await
                    .map_err(|e| log_failure(PipelineError::Summarize(e)))?;
                info!(stage = %Stage::Summarized, sentences = summary.sentences.len());
                summary.text()
            }
            TransformInput::ExtractedText => {
                info!(stage = %Stage::Summarized, "transformer reads extracted text, summarizer skipped");
                text
            }
        };

        let message = self
            .transformer
            .transform(&input)
            .await
            .map_err(|e| log_failure(PipelineError::Transform(e)))?;
        info!(stage = %Stage::Transformed, chars = message.len());

        Ok(message)
    }

    /// Run every stage for `url` and return the notifier's JSON response.
    pub async fn run(&self, url: &str) -> Result<Value, PipelineError> {
        let message = self.prepare(url).await?;

        let result = self
            .notifier
            .notify(url.trim(), &message)
            .await
            .map_err(|e| log_failure(PipelineError::Notify(e)))?;
        info!(stage = %Stage::Notified);

        Ok(result)
    }
}

fn log_failure(err: PipelineError) -> PipelineError {
    error!(reached = %err.reached(), error = %err, "pipeline stopped");
    err
}
