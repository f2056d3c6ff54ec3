//! Anthropic Claude messages adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_from_response, ProviderAdapter, ProviderError, ProviderResult};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "claude";

pub struct ClaudeAdapter {
    client: Client,
    base_url: String,
}

impl ClaudeAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: ANTHROPIC_API_BASE.to_string(),
        }
    }

    /// Points the adapter at another host (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn default_model(&self) -> &'static str {
        "claude-3-5-haiku-20241022"
    }

    async fn complete(&self, prompt: &str, api_key: &str, model: &str) -> ProviderResult<String> {
        let body = MessageRequest {
            model,
            max_tokens: 1000,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model, "sending request to Claude");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let status = response.status().as_u16();
        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        // concatenate text blocks, ignore tool/other blocks
        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::new(
                PROVIDER,
                Some(status),
                "no text content in Claude response",
            ));
        }
        Ok(text)
    }
}
