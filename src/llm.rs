//! Text generation: the stylist/extraction model behind a small trait.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const CLAUDE_API_KEY_VAR: &str = "CLAUDE_API_KEY";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} environment variable is not set")] MissingCredential(String),
    #[error("HTTP error: {0}")] Request(String),
    #[error("API error: status={status} message={message}")] Api { status: u16, message: String },
    #[error("empty response from text model")] EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One system+user exchange; returns the model's text.
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;

    /// Same call pinned to temperature 0, for structured JSON answers.
    async fn call_json(&self, system_prompt: &str, user_prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        self.call(system_prompt, user_prompt, max_tokens, 0.0).await
    }
}

/// Anthropic Messages API client. The key is looked up on every call.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    model: String,
    api_key_var: String,
}

impl AnthropicClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DEFAULT_REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key_var: CLAUDE_API_KEY_VAR.to_string(),
        }
    }

    /// Caps every request, connect through the last body byte.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = Client::builder().timeout(timeout).build() {
            self.client = client;
        }
        self
    }

    fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(&self.api_key_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingCredential(self.api_key_var.clone()))
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key()?;

        let mut body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{ "role": "user", "content": user_prompt }],
        });
        if !system_prompt.trim().is_empty() {
            body["system"] = json!(system_prompt);
        }

        info!("🧠 Calling {} (max_tokens={}, temperature={})", self.model, max_tokens, temperature);
        debug!("User prompt (truncated): {}", &user_prompt[..floor_char_boundary(user_prompt, 200)]);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| LlmError::Request(e.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            error!("❌ Text model call failed with status {}: {}", status, message);
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Request(format!("parse error: {e}")))?;
        first_text(&parsed).ok_or(LlmError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody { error: ApiErrorDetail }

#[derive(Debug, Deserialize)]
struct ApiErrorDetail { message: String }

fn first_text(response: &MessagesResponse) -> Option<String> {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Pulls the JSON document out of a model reply.
///
/// Models sometimes wrap the document in a Markdown fence or add a sentence
/// before it; the outermost `{..}` or `[..]` span is returned.
pub fn extract_json_payload(text: &str) -> &str {
    let trimmed = text.trim();
    let start = trimmed.find(|c: char| c == '{' || c == '[');
    let end = trimmed.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_json_is_unwrapped() {
        let reply = "Here you go:\n```json\n{\"style_guide\": {}}\n```";
        assert_eq!(extract_json_payload(reply), "{\"style_guide\": {}}");
    }

    #[test]
    fn plain_json_is_untouched() {
        assert_eq!(extract_json_payload("  [1, 2]  "), "[1, 2]");
        assert_eq!(extract_json_payload("no json here"), "no json here");
    }

    #[test]
    fn first_non_empty_text_block_wins() {
        let parsed: MessagesResponse = serde_json::from_value(json!({
            "content": [
                { "type": "thinking" },
                { "type": "text", "text": "   " },
                { "type": "text", "text": " hello " }
            ]
        }))
        .unwrap();
        assert_eq!(first_text(&parsed).as_deref(), Some("hello"));
    }

    #[test]
    fn empty_content_yields_nothing() {
        let parsed: MessagesResponse = serde_json::from_value(json!({ "content": [] })).unwrap();
        assert!(first_text(&parsed).is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut client = AnthropicClient::new("http://127.0.0.1:9", "test-model");
        client.api_key_var = "TREND_STYLIST_TEST_UNSET_KEY".to_string();
        let err = client.call("system", "user", 10, 0.0).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential(var) if var == "TREND_STYLIST_TEST_UNSET_KEY"));
    }

    #[tokio::test]
    async fn silent_server_hits_the_request_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        std::env::set_var("TREND_STYLIST_TEST_TIMEOUT_KEY", "test-key");
        let mut client = AnthropicClient::new(base, "test-model").with_timeout(Duration::from_millis(200));
        client.api_key_var = "TREND_STYLIST_TEST_TIMEOUT_KEY".to_string();

        let result = tokio::time::timeout(Duration::from_secs(10), client.call("system", "user", 10, 0.0)).await;
        assert!(matches!(result, Ok(Err(LlmError::Request(_)))));
        drop(listener);
    }

    #[test]
    fn char_boundary_never_splits_a_character() {
        let s = "ééé";
        assert_eq!(floor_char_boundary(s, 3), 2);
        assert_eq!(floor_char_boundary(s, 100), s.len());
    }
}
