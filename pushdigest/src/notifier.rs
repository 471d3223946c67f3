use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Push-messaging client (LINE Messaging API push endpoint).
pub struct PushClient {
    push_url: String,
    access_token: String,
    recipient: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl PushClient {
    pub fn new(
        push_url: impl Into<String>,
        access_token: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            push_url: push_url.into(),
            access_token: access_token.into(),
            recipient: recipient.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Push one text message to the configured recipient.
    ///
    /// The provider's JSON body is returned whatever the HTTP status, so an
    /// error body from the provider reaches the caller unchanged.
    pub async fn push_text(&self, text: &str) -> Result<Value> {
        let body = PushRequest {
            to: &self.recipient,
            messages: vec![TextMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(&self.push_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("push HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "push provider returned an error status");
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("push response (status {}) is not JSON", status))
    }
}

/// Delivers the final message, optionally preceded by the source URL.
pub struct Notifier {
    client: PushClient,
    echo_source_url: bool,
}

impl Notifier {
    pub fn new(client: PushClient, echo_source_url: bool) -> Self {
        Self {
            client,
            echo_source_url,
        }
    }

    pub fn echoes_source_url(&self) -> bool {
        self.echo_source_url
    }

    /// Send `message` (and first `source_url` when echoing is enabled) as
    /// separate sequential pushes. The URL push result is discarded; the
    /// parsed response of the last push is returned.
    pub async fn notify(&self, source_url: &str, message: &str) -> Result<Value> {
        if self.echo_source_url {
            if let Err(e) = self.client.push_text(source_url).await {
                warn!(error = %e, "source URL push failed, continuing with summary");
            }
        }

        let result = self.client.push_text(message).await?;
        info!("summary pushed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_payload_shape() {
        let body = PushRequest {
            to: "U123",
            messages: vec![TextMessage { kind: "text", text: "hi" }],
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"to": "U123", "messages": [{"type": "text", "text": "hi"}]})
        );
    }
}
