//! Extractive summarization through the Azure AI Language `analyze-text` job API.
//!
//! A job is submitted with a single document and a single
//! `ExtractiveSummarization` task. The service answers `202 Accepted` with an
//! `operation-location` header; that URL is polled until the job reaches a
//! terminal status. Results may be split over several pages linked by
//! `nextLink`, and every page is read before the sentences are returned.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Summarizer, Summary};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const MAX_RESULT_PAGES: usize = 50;

pub struct TextAnalyticsSummarizer {
    endpoint: String,
    api_key: String,
    api_version: String,
    language: String,
    poll_interval: Duration,
    max_polls: u32,
    client: reqwest::Client,
}

impl TextAnalyticsSummarizer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: "2023-04-01".to_string(),
            language: "en".to_string(),
            poll_interval: Duration::from_secs(1),
            max_polls: 120,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    /// Submit the job and return its `operation-location`.
    async fn submit(&self, text: &str, max_sentences: usize) -> Result<String> {
        let url = format!(
            "{}/language/analyze-text/jobs?api-version={}",
            self.endpoint, self.api_version
        );

        let body = JobRequest {
            display_name: "pushdigest extractive summary",
            analysis_input: AnalysisInput {
                documents: vec![InputDocument {
                    id: "0",
                    language: &self.language,
                    text,
                }],
            },
            tasks: vec![TaskRequest {
                kind: "ExtractiveSummarization",
                task_name: "extractive-summary",
                parameters: TaskParameters {
                    sentence_count: max_sentences,
                },
            }],
        };

        let response = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .context("summarization job submission failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("summarization API error {}: {}", status, body);
        }

        let location = response
            .headers()
            .get("operation-location")
            .context("summarization response has no operation-location header")?
            .to_str()
            .context("operation-location header is not valid UTF-8")?
            .to_string();

        debug!(%location, "summarization job submitted");
        Ok(location)
    }

    async fn get_page(&self, url: &str) -> Result<JobState> {
        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("summarization job request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("summarization API error {}: {}", status, body);
        }

        response
            .json::<JobState>()
            .await
            .context("Failed to parse summarization job state")
    }

    /// Poll the job until it reaches a terminal status; returns the first result page.
    async fn wait_for_job(&self, location: &str) -> Result<JobState> {
        for attempt in 1..=self.max_polls {
            let state = self.get_page(location).await?;
            match state.status.as_str() {
                "succeeded" | "partiallySucceeded" | "partiallyCompleted" => return Ok(state),
                "failed" | "cancelled" | "cancelling" => {
                    let reasons: Vec<String> =
                        state.errors.iter().map(|e| e.to_string()).collect();
                    anyhow::bail!(
                        "summarization job ended with status '{}': {}",
                        state.status,
                        reasons.join("; ")
                    );
                }
                other => {
                    debug!(attempt, status = other, "summarization job not finished yet");
                    if attempt < self.max_polls {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        }
        anyhow::bail!(
            "summarization job did not finish after {} polls",
            self.max_polls
        )
    }
}

#[async_trait::async_trait]
impl Summarizer for TextAnalyticsSummarizer {
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<Summary> {
        let location = self.submit(text, max_sentences).await?;
        let mut page = self.wait_for_job(&location).await?;

        let mut sentences = Vec::new();
        let mut seen = HashSet::from([location]);
        let mut pages = 1usize;
        loop {
            collect_sentences(&page, &mut sentences);
            let Some(next) = page.next_link.take() else {
                break;
            };
            if pages >= MAX_RESULT_PAGES {
                warn!(pages, "summarization result page limit reached, ignoring the rest");
                break;
            }
            if !seen.insert(next.clone()) {
                warn!(%next, "summarization nextLink repeats an earlier page, stopping");
                break;
            }
            page = self.get_page(&next).await?;
            pages += 1;
        }

        if sentences.is_empty() {
            anyhow::bail!("summarization returned no sentences");
        }

        info!(
            sentences = sentences.len(),
            pages,
            "summarization complete"
        );
        Ok(Summary { sentences })
    }
}

/// Append every sentence of every document on `page`, logging and skipping
/// per-document and per-task errors.
fn collect_sentences(page: &JobState, out: &mut Vec<String>) {
    for task in &page.tasks.items {
        if task.status.as_deref() == Some("failed") {
            warn!(task = ?task.task_name, "summarization task failed");
        }
        let Some(results) = &task.results else {
            continue;
        };
        for doc_error in &results.errors {
            warn!(document = %doc_error.id, error = %doc_error.error, "summarization document error, skipping");
        }
        for document in &results.documents {
            out.extend(document.sentences.iter().map(|s| s.text.clone()));
        }
    }
}

// Request structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobRequest<'a> {
    display_name: &'a str,
    analysis_input: AnalysisInput<'a>,
    tasks: Vec<TaskRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct AnalysisInput<'a> {
    documents: Vec<InputDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct InputDocument<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRequest<'a> {
    kind: &'a str,
    task_name: &'a str,
    parameters: TaskParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskParameters {
    sentence_count: usize,
}

// Response structures
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobState {
    status: String,
    #[serde(default)]
    errors: Vec<ServiceError>,
    #[serde(default)]
    tasks: Tasks,
    next_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Tasks {
    #[serde(default)]
    items: Vec<TaskResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResult {
    task_name: Option<String>,
    status: Option<String>,
    results: Option<TaskResults>,
}

#[derive(Debug, Deserialize)]
struct TaskResults {
    #[serde(default)]
    documents: Vec<DocumentResult>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
struct DocumentResult {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Debug, Deserialize)]
struct Sentence {
    text: String,
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    id: String,
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_errors_are_skipped() {
        let page: JobState = serde_json::from_str(
            r#"{
                "status": "partiallySucceeded",
                "tasks": {"items": [{
                    "kind": "ExtractiveSummarizationLROResults",
                    "taskName": "extractive-summary",
                    "status": "succeeded",
                    "results": {
                        "documents": [{"id": "0", "sentences": [{"text": "Kept.", "rankScore": 1.0}], "warnings": []}],
                        "errors": [{"id": "1", "error": {"code": "InvalidDocument", "message": "Document text is empty."}}],
                        "modelVersion": "2022-10-01"
                    }
                }]}
            }"#,
        )
        .expect("parse page");

        let mut sentences = Vec::new();
        collect_sentences(&page, &mut sentences);
        assert_eq!(sentences, vec!["Kept.".to_string()]);
    }

    #[test]
    fn submission_body_carries_one_document_and_sentence_cap() {
        let body = JobRequest {
            display_name: "x",
            analysis_input: AnalysisInput {
                documents: vec![InputDocument { id: "0", language: "en", text: "hello" }],
            },
            tasks: vec![TaskRequest {
                kind: "ExtractiveSummarization",
                task_name: "t",
                parameters: TaskParameters { sentence_count: 8 },
            }],
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["analysisInput"]["documents"].as_array().map(|d| d.len()), Some(1));
        assert_eq!(json["tasks"][0]["parameters"]["sentenceCount"], 8);
    }
}
