//! Shared helpers: canned service payloads and a pipeline wired to one mock server.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use common::FetchConfig;
use pushdigest::llm::remote::RemoteLlmProvider;
use pushdigest::notifier::{Notifier, PushClient};
use pushdigest::pipeline::Pipeline;
use pushdigest::scraping::ArticleFetcher;
use pushdigest::summarizer::text_analytics::TextAnalyticsSummarizer;
use pushdigest::transform::{GenerativeTranslate, ServiceTranslate, StructuredExtraction, Transformer};
use pushdigest::translator::TranslatorClient;

pub const JOBS_PATH: &str = "/language/analyze-text/jobs";
pub const JOB_PATH: &str = "/language/analyze-text/jobs/job-1";
pub const CHAT_PATH: &str = "/openai/deployments/gpt-test/chat/completions";
pub const TRANSLATE_PATH: &str = "/translate";
pub const PUSH_PATH: &str = "/v2/bot/message/push";
pub const RECIPIENT: &str = "U0123456789";

pub fn article_html(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!("<html><head><title>t</title></head><body><h1>Headline</h1>{}</body></html>", body)
}

/// A finished analyze-text job page carrying `sentences` for document "0".
pub fn job_page(sentences: &[&str], next_link: Option<&str>) -> String {
    let sentences: Vec<serde_json::Value> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| serde_json::json!({"text": s, "rankScore": 1.0, "offset": i * 10, "length": s.len()}))
        .collect();
    let mut page = serde_json::json!({
        "jobId": "job-1",
        "status": "succeeded",
        "errors": [],
        "tasks": {
            "completed": 1, "failed": 0, "inProgress": 0, "total": 1,
            "items": [{
                "kind": "ExtractiveSummarizationLROResults",
                "taskName": "extractive-summary",
                "status": "succeeded",
                "results": {
                    "documents": [{"id": "0", "sentences": sentences, "warnings": []}],
                    "errors": [],
                    "modelVersion": "2022-10-01"
                }
            }]
        }
    });
    if let Some(link) = next_link {
        page["nextLink"] = serde_json::Value::String(link.to_string());
    }
    page.to_string()
}

pub fn chat_reply(content: &str) -> String {
    serde_json::json!({
        "model": "gpt-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
    .to_string()
}

pub fn job_location(base: &str) -> String {
    format!("{}{}?api-version=2023-04-01", base, JOB_PATH)
}

pub fn summarizer(base: &str) -> TextAnalyticsSummarizer {
    TextAnalyticsSummarizer::new(base, "ta-key").with_polling(Duration::ZERO, 3)
}

pub fn chat_provider(base: &str) -> Arc<RemoteLlmProvider> {
    Arc::new(RemoteLlmProvider::azure(base, "llm-key", "gpt-test", "2024-02-15-preview"))
}

pub fn translator(base: &str) -> TranslatorClient {
    TranslatorClient::new(base, "tr-key", "japaneast")
}

pub fn push_client(base: &str) -> PushClient {
    PushClient::new(format!("{}{}", base, PUSH_PATH), "line-token", RECIPIENT)
}

#[derive(Debug, Clone, Copy)]
pub enum Variant {
    GenerativeTranslate,
    ServiceTranslate,
    StructuredExtraction,
}

/// Pipeline whose every external service lives on `base`.
pub fn pipeline(base: &str, variant: Variant, max_sentences: usize, echo_source_url: bool) -> Pipeline {
    let transformer: Arc<dyn Transformer> = match variant {
        Variant::GenerativeTranslate => Arc::new(GenerativeTranslate::new(chat_provider(base), "Japanese")),
        Variant::ServiceTranslate => Arc::new(ServiceTranslate::new(translator(base))),
        Variant::StructuredExtraction => Arc::new(StructuredExtraction::new(chat_provider(base), "Japanese")),
    };

    Pipeline::new(
        ArticleFetcher::new(&FetchConfig::default()).expect("fetcher"),
        Arc::new(summarizer(base)),
        max_sentences,
        transformer,
        Notifier::new(push_client(base), echo_source_url),
    )
}
