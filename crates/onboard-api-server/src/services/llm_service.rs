use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::models::chat::{ChatMessage, MessageContent};

/// The chat-completions backend as seen by the conversation manager: an
/// ordered list of role-tagged messages in, one reply out, or a
/// transport/auth/timeout error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<MessageContent>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: MessageContent,
}

#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self> {
        // Client-level timeout bounds every model call; expiry surfaces as a
        // plain request error on the failure path.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<MessageContent> {
        debug!("Requesting completion with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to call LLM API: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error: {} - {}", status, body);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse LLM response: {}", e))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("No choices returned from LLM"))
    }
}

#[async_trait::async_trait]
impl ChatCompletionProvider for LlmService {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<MessageContent> {
        self.chat(messages).await
    }
}
