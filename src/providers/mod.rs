//! LLM vendor adapters
//!
//! Each vendor implements [`ProviderAdapter`] with its own request envelope.
//! Adapters are looked up by name in a [`ProviderRegistry`], so the dispatch
//! handler never branches on the vendor.

mod claude;
mod deepseek;
mod gemini;
mod openai;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::sanitize::sanitize;

pub use claude::ClaudeAdapter;
pub use deepseek::deepseek_adapter;
pub use gemini::GeminiAdapter;
pub use openai::ChatCompletionsAdapter;

/// Prompt sent by [`ProviderAdapter::test_key`]
pub const TEST_PROMPT: &str = "Hello";

/// A failed vendor call
///
/// `status` is the vendor's HTTP status when one was received; transport
/// failures and timeouts have none.
#[derive(Debug, Error)]
#[error("{provider} API error: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            provider,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.to_string()
        };
        Self::new(provider, err.status().map(|s| s.as_u16()), message)
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Capability shared by all vendor adapters
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Registry key, e.g. "openai"
    fn name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    /// Sends `prompt` and returns the raw generated text
    async fn complete(&self, prompt: &str, api_key: &str, model: &str) -> ProviderResult<String>;

    /// Generates text for `prompt` and returns it sanitized
    async fn invoke(
        &self,
        prompt: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> ProviderResult<String> {
        let model = model.filter(|m| !m.trim().is_empty()).unwrap_or(self.default_model());
        let raw = self.complete(prompt, api_key, model).await?;
        let clean = sanitize(&raw);
        if clean.is_empty() {
            return Err(ProviderError::new(
                self.name(),
                None,
                "response contained no usable text",
            ));
        }
        Ok(clean)
    }

    /// Issues a minimal prompt to check that `api_key` works; returns the model used
    async fn test_key(&self, api_key: &str, model: Option<&str>) -> ProviderResult<String> {
        let model = model.filter(|m| !m.trim().is_empty()).unwrap_or(self.default_model());
        self.complete(TEST_PROMPT, api_key, model).await?;
        Ok(model.to_string())
    }
}

/// Name → adapter lookup table
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four supported vendors sharing one HTTP client
    pub fn with_defaults(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("falling back to default HTTP client: {}", err);
                Client::new()
            });

        Self::new()
            .register(Arc::new(GeminiAdapter::new(client.clone())))
            .register(Arc::new(ChatCompletionsAdapter::openai(client.clone())))
            .register(Arc::new(ClaudeAdapter::new(client.clone())))
            .register(Arc::new(deepseek_adapter(client)))
    }

    pub fn register(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&name.trim().to_ascii_lowercase()).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Reads a non-2xx vendor response into a `ProviderError`
///
/// Vendors report failures as `{"error": {"message": ...}}`; the raw body is
/// used when it has another shape.
pub(crate) async fn error_from_response(
    provider: &'static str,
    response: reqwest::Response,
) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!("{} API error: {} - {}", provider, status, body);
    ProviderError::new(provider, Some(status.as_u16()), vendor_error_message(&body, status))
}

fn vendor_error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match message {
        Some(m) if !m.is_empty() => m,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("HTTP {}", status.as_u16()),
    }
}
