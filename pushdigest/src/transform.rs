//! Turns summarized (or raw) article text into the message that gets pushed.
//!
//! Each deployment runs exactly one strategy, chosen from configuration at startup.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::llm::{LlmProvider, LlmRequest};
use crate::translator::{joined_text, TranslatorClient};

/// Which text a transformer consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformInput {
    Summary,
    ExtractedText,
}

#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
    /// Stable name used in logs and the status endpoint
    fn name(&self) -> &'static str;

    fn input(&self) -> TransformInput {
        TransformInput::Summary
    }

    /// Produce the final message. Empty output is an error.
    async fn transform(&self, text: &str) -> Result<String>;
}

fn non_empty(output: String, what: &str) -> Result<String> {
    if output.trim().is_empty() {
        anyhow::bail!("{} produced empty output", what);
    }
    Ok(output)
}

/// Chat model translates the summary and formats it as a bullet list.
pub struct GenerativeTranslate {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
}

impl GenerativeTranslate {
    pub fn new(llm: Arc<dyn LlmProvider>, target_language: &str) -> Self {
        Self {
            llm,
            system_prompt: format!(
                "Please translate the provided text to {} and format it as a bullet list.",
                target_language
            ),
        }
    }
}

#[async_trait::async_trait]
impl Transformer for GenerativeTranslate {
    fn name(&self) -> &'static str {
        "generative_translate"
    }

    async fn transform(&self, text: &str) -> Result<String> {
        let response = self
            .llm
            .generate(LlmRequest::with_system(self.system_prompt.clone(), text))
            .await
            .context("translate-and-format completion failed")?;
        info!(total_tokens = response.usage.total_tokens, "summary translated");
        non_empty(response.content, "translate-and-format completion")
    }
}

/// Dedicated machine translation service.
pub struct ServiceTranslate {
    translator: TranslatorClient,
}

impl ServiceTranslate {
    pub fn new(translator: TranslatorClient) -> Self {
        Self { translator }
    }
}

#[async_trait::async_trait]
impl Transformer for ServiceTranslate {
    fn name(&self) -> &'static str {
        "service_translate"
    }

    async fn transform(&self, text: &str) -> Result<String> {
        let results = self.translator.translate(text).await?;
        non_empty(joined_text(&results), "translation service")
    }
}

/// Two chat calls over the raw article text, one per pair of fields, joined
/// by a newline. Both must succeed.
pub struct StructuredExtraction {
    llm: Arc<dyn LlmProvider>,
    headline_prompt: String,
    analysis_prompt: String,
}

impl StructuredExtraction {
    pub fn new(llm: Arc<dyn LlmProvider>, target_language: &str) -> Self {
        Self {
            llm,
            headline_prompt: format!(
                "Extract the following fields from the provided text and answer in {lang}.\n\
                 title: the title of the article\n\
                 new features/improvements: the new features or improvements it announces, as a bullet list",
                lang = target_language
            ),
            analysis_prompt: format!(
                "Extract the following fields from the provided text and answer in {lang}.\n\
                 explanation: a short explanation of what changed\n\
                 importance: why the change matters to its users",
                lang = target_language
            ),
        }
    }
}

#[async_trait::async_trait]
impl Transformer for StructuredExtraction {
    fn name(&self) -> &'static str {
        "structured_extraction"
    }

    fn input(&self) -> TransformInput {
        TransformInput::ExtractedText
    }

    async fn transform(&self, text: &str) -> Result<String> {
        let headline = self
            .llm
            .generate(LlmRequest::with_system(self.headline_prompt.clone(), text))
            .await
            .context("title/features extraction failed")?;
        let analysis = self
            .llm
            .generate(LlmRequest::with_system(self.analysis_prompt.clone(), text))
            .await
            .context("explanation/importance extraction failed")?;

        non_empty(
            format!("{}\n{}", headline.content, analysis.content),
            "structured extraction",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, UsageMetadata};
    use std::sync::Mutex;

    /// Replays canned replies and records every request it sees.
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String>>>,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
            self.seen.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))?;
            Ok(LlmResponse {
                content: reply,
                usage: UsageMetadata::default(),
                model: "scripted".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn generative_translate_sends_system_instruction_and_summary() {
        let llm = ScriptedLlm::new(vec![Ok("・こんにちは".to_string())]);
        let transformer = GenerativeTranslate::new(llm.clone(), "Japanese");

        let out = transformer.transform("Hello.").await.expect("transform");
        assert_eq!(out, "・こんにちは");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].system.as_deref(),
            Some("Please translate the provided text to Japanese and format it as a bullet list.")
        );
        assert_eq!(seen[0].prompt, "Hello.");
    }

    #[tokio::test]
    async fn generative_translate_rejects_blank_reply() {
        let llm = ScriptedLlm::new(vec![Ok("   ".to_string())]);
        let transformer = GenerativeTranslate::new(llm, "Japanese");
        assert!(transformer.transform("Hello.").await.is_err());
    }

    #[tokio::test]
    async fn structured_extraction_joins_both_replies_with_newline() {
        let llm = ScriptedLlm::new(vec![Ok("title".to_string()), Ok("importance".to_string())]);
        let transformer = StructuredExtraction::new(llm.clone(), "Japanese");
        assert_eq!(transformer.input(), TransformInput::ExtractedText);

        let out = transformer.transform("raw text").await.expect("transform");
        assert_eq!(out, "title\nimportance");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0].system, seen[1].system);
        assert!(seen.iter().all(|r| r.prompt == "raw text"));
    }

    #[tokio::test]
    async fn structured_extraction_fails_when_second_call_fails() {
        let llm = ScriptedLlm::new(vec![
            Ok("title".to_string()),
            Err(anyhow::anyhow!("content filter")),
        ]);
        let transformer = StructuredExtraction::new(llm, "Japanese");
        assert!(transformer.transform("raw text").await.is_err());
    }

    #[tokio::test]
    async fn structured_extraction_stops_after_first_failure() {
        let llm = ScriptedLlm::new(vec![Err(anyhow::anyhow!("boom")), Ok("unused".to_string())]);
        let transformer = StructuredExtraction::new(llm.clone(), "Japanese");
        assert!(transformer.transform("raw text").await.is_err());
        assert_eq!(llm.seen.lock().unwrap().len(), 1);
    }
}
