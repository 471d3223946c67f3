use anyhow::Result;

/// Extractive summarization backends
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Pick at most `max_sentences` sentences out of `text`.
    ///
    /// An empty selection is an error, never an empty `Summary`.
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<Summary>;
}

/// Sentences selected by the service, in the order it returned them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub sentences: Vec<String>,
}

impl Summary {
    /// Sentences joined by single spaces
    pub fn text(&self) -> String {
        self.sentences.join(" ")
    }
}

pub mod text_analytics;
