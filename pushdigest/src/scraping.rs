use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, warn};

use common::FetchConfig;

/// Downloads article pages and extracts their paragraph text.
///
/// The underlying client is built once and reused for every request.
#[derive(Clone)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("pushdigest/{}", env!("CARGO_PKG_VERSION")));

        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build reqwest client")?;

        Ok(Self { client })
    }

    /// Fetch `url` and return the text of every `<p>` element, in document
    /// order, joined by single spaces.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("failed to parse article URL")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("unsupported URL scheme: {}", parsed.scheme());
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "scraping: article fetch returned an error status");
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        let html_content = response.text().await.context("failed to read response body")?;
        let text = paragraph_text(&html_content)?;

        if text.trim().is_empty() {
            warn!(%url, "scraping: no paragraph text found");
            anyhow::bail!("no paragraph text found at {}", url);
        }

        info!(%url, chars = text.len(), "scraping: extracted paragraph text");
        Ok(text)
    }
}

/// Concatenate the text content of every paragraph in `html`.
pub fn paragraph_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let p_selector = Selector::parse("p")
        .map_err(|e| anyhow::anyhow!("invalid paragraph selector: {:?}", e))?;

    let paragraphs: Vec<String> = document
        .select(&p_selector)
        .map(|element| element.text().collect::<String>())
        .collect();

    Ok(paragraphs.join(" "))
}
