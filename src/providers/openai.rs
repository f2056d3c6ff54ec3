//! OpenAI-compatible `chat/completions` adapter
//!
//! OpenAI and DeepSeek share this envelope; they differ only in base URL,
//! registry name and default model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_from_response, ProviderAdapter, ProviderError, ProviderResult};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct ChatCompletionsAdapter {
    client: Client,
    name: &'static str,
    base_url: String,
    default_model: &'static str,
}

impl ChatCompletionsAdapter {
    pub fn new(
        client: Client,
        name: &'static str,
        base_url: impl Into<String>,
        default_model: &'static str,
    ) -> Self {
        Self {
            client,
            name,
            base_url: base_url.into(),
            default_model,
        }
    }

    pub fn openai(client: Client) -> Self {
        Self::new(client, "openai", OPENAI_API_BASE, "gpt-4o-mini")
    }

    /// Points the adapter at another host (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
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
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ProviderAdapter for ChatCompletionsAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn default_model(&self) -> &'static str {
        self.default_model
    }

    async fn complete(&self, prompt: &str, api_key: &str, model: &str) -> ProviderResult<String> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 1000,
            temperature: 0.7,
        };

        debug!(provider = self.name, model, "sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(self.name, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name, response).await);
        }

        let status = response.status().as_u16();
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(self.name, e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| {
                ProviderError::new(self.name, Some(status), "no message content in response")
            })
    }
}
