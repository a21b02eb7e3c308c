use crate::error::CourierError;
use async_trait::async_trait;

/// A completion call with its per-call resolved configuration.
///
/// Credentials live in the configurations table, so they arrive with the
/// request instead of being baked into the client at construction.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    /// The user message to complete against.
    pub text: String,
}

/// Completion provider trait — the auto-reply brain.
///
/// Implemented by text-completion backends; fakes stand in for it in tests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Produce a single completion for the request. No retry, no streaming.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CourierError>;
}

/// An outbound text message with its per-call resolved credentials.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub api_url: String,
    pub access_token: String,
    /// Destination phone number.
    pub to: String,
    pub body: String,
}

/// Outbound sender trait — posts replies back to the messaging provider.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Submit a send request. Returns the provider-assigned message id of
    /// the accepted message when the provider reports one.
    async fn send_text(&self, request: &SendRequest) -> Result<Option<String>, CourierError>;
}
