//! OpenAI chat completions client (https://api.openai.com by default).
//! Non-streaming only: the router needs one completion text per fallback reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("openai request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("openai api error: {0}")]
    Api(String),
    #[error("openai returned no completion choices")]
    Empty,
}

/// Fixed sampling parameters for completions. Set once from config at startup,
/// not user-configurable at runtime.
#[derive(Debug, Clone, Copy)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Produces one completion for a system prompt and a single user turn. Seam
/// for the router so tests can count invocations without a network.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_text: &str,
        sampling: SamplingConfig,
    ) -> Result<String, OpenAiError>;
}

/// Client for the OpenAI chat completions API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v1/chat/completions — one completion for [system, user] messages.
    pub async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_text: &str,
        sampling: SamplingConfig,
    ) -> Result<String, OpenAiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(OpenAiError::Api(format!("{} {}", status, body)));
        }
        let data: ChatResponse = res.json().await?;
        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(OpenAiError::Empty)
    }
}

#[async_trait]
impl Completer for OpenAiClient {
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_text: &str,
        sampling: SamplingConfig,
    ) -> Result<String, OpenAiError> {
        OpenAiClient::complete(self, model, system_prompt, user_text, sampling).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
