//! OpenAI-compatible completion provider.
//!
//! Works with OpenAI's API and any compatible endpoint.

use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    traits::{CompletionProvider, CompletionRequest},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible completion client. The API key arrives with each
/// request, resolved from the configurations table.
pub struct OpenAiCompletion {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiCompletion {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create against a non-default endpoint (compatible providers, tests).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl Default for OpenAiCompletion {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the chat message list (system prompt as a leading message role).
fn build_messages(system: &str, user: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: user.to_string(),
    });
    messages
}

#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CourierError> {
        if request.api_key.trim().is_empty() {
            return Err(CourierError::Config(
                "completion API key not configured".into(),
            ));
        }

        let body = ChatCompletionRequest {
            model: request.model.clone(),
            messages: build_messages(&request.system_prompt, &request.text),
            temperature: 0.0,
            max_tokens: 2048,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", request.model);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", request.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CourierError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| CourierError::Provider(format!("openai: failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CourierError::Provider("openai: response carried no usable content".into())
            })?;

        Ok(text)
    }
}
