//! Vendor envelope tests against a local mock server

use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ai_disguise::providers::{
    deepseek_adapter, ChatCompletionsAdapter, ClaudeAdapter, GeminiAdapter, ProviderAdapter,
};

#[tokio::test]
async fn test_gemini_generate_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "g-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "rewrite me" }] }],
            "generationConfig": { "maxOutputTokens": 1000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "```\nRewritten!\n```" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(Client::new()).with_base_url(server.uri());
    let result = adapter.invoke("rewrite me", "g-key", None).await.unwrap();

    assert_eq!(result, "Rewritten!");
}

#[tokio::test]
async fn test_openai_chat_completions_with_model_override() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [{ "role": "user", "content": "rewrite me" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "\"Polished text\"" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ChatCompletionsAdapter::openai(Client::new()).with_base_url(server.uri());
    let result = adapter
        .invoke("rewrite me", "sk-test", Some("gpt-4o"))
        .await
        .unwrap();

    assert_eq!(result, "Polished text");
}

#[tokio::test]
async fn test_deepseek_uses_default_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "deepseek-chat" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "ok" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = deepseek_adapter(Client::new()).with_base_url(server.uri());
    let model = adapter.test_key("ds-key", None).await.unwrap();

    assert_eq!(model, "deepseek-chat");
}

#[tokio::test]
async fn test_claude_messages_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "c-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "Result: A gentle " },
                { "type": "text", "text": "reply" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ClaudeAdapter::new(Client::new()).with_base_url(server.uri());
    let result = adapter.invoke("rewrite me", "c-key", None).await.unwrap();

    assert_eq!(result, "A gentle reply");
}

#[tokio::test]
async fn test_vendor_error_message_is_propagated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let adapter = ChatCompletionsAdapter::openai(Client::new()).with_base_url(server.uri());
    let err = adapter.test_key("sk-wrong", None).await.unwrap_err();

    assert_eq!(err.provider, "openai");
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Incorrect API key provided");
    assert_eq!(
        err.to_string(),
        "openai API error: Incorrect API key provided"
    );
}

#[tokio::test]
async fn test_response_without_text_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(Client::new()).with_base_url(server.uri());
    let err = adapter.invoke("rewrite me", "g-key", None).await.unwrap_err();

    assert_eq!(err.provider, "gemini");
    assert_eq!(err.status, Some(200));
}

#[tokio::test]
async fn test_output_that_sanitizes_to_nothing_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "```\n```" }]
        })))
        .mount(&server)
        .await;

    let adapter = ClaudeAdapter::new(Client::new()).with_base_url(server.uri());
    let err = adapter.invoke("rewrite me", "c-key", None).await.unwrap_err();

    assert_eq!(err.message, "response contained no usable text");
}
