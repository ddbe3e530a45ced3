//! LINE reply client: send reply messages via the Messaging API.

use async_trait::async_trait;

const LINE_API_BASE: &str = "https://api.line.me";

/// Maximum message objects per reply call (Messaging API limit).
const MAX_MESSAGES_PER_REPLY: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("line api error: {0}")]
    Api(String),
}

/// Sends one reply (one or more text messages) for a reply token. Seam for the
/// router so tests can count sends without a network.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<(), LineError>;
}

/// Client for the LINE Messaging API reply endpoint.
#[derive(Clone)]
pub struct LineClient {
    base_url: String,
    channel_access_token: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(channel_access_token: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            base_url,
            channel_access_token: channel_access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v2/bot/message/reply — send 1..=5 text messages for a reply token.
    /// A reply token is single-use, so the router calls this at most once per event.
    pub async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<(), LineError> {
        if texts.is_empty() || texts.len() > MAX_MESSAGES_PER_REPLY {
            return Err(LineError::Api(format!(
                "reply requires 1..={} messages, got {}",
                MAX_MESSAGES_PER_REPLY,
                texts.len()
            )));
        }
        let messages: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| serde_json::json!({ "type": "text", "text": t }))
            .collect();
        let url = format!("{}/v2/bot/message/reply", self.base_url);
        let body = serde_json::json!({ "replyToken": reply_token, "messages": messages });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LineError::Api(format!("reply failed: {} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, texts: &[String]) -> Result<(), LineError> {
        LineClient::reply(self, reply_token, texts).await
    }
}
