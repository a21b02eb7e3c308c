//! Outbound sending via the WhatsApp Cloud API messages endpoint.

use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    traits::{OutboundSender, SendRequest},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Cloud API sender. The endpoint and credentials arrive with each request,
/// resolved from the configurations table.
pub struct CloudApiSender {
    client: reqwest::Client,
}

impl CloudApiSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for CloudApiSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body for sending a text message.
#[derive(Debug, Clone, Serialize)]
pub struct SendTextBody {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub text: OutboundText,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundText {
    pub preview_url: bool,
    pub body: String,
}

impl SendTextBody {
    pub fn new(to: &str, body: &str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: to.to_string(),
            message_type: "text",
            text: OutboundText {
                preview_url: false,
                body: body.to_string(),
            },
        }
    }
}

/// Send response; carries the provider id assigned to the accepted message.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[async_trait]
impl OutboundSender for CloudApiSender {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send_text(&self, request: &SendRequest) -> Result<Option<String>, CourierError> {
        if request.api_url.trim().is_empty() {
            return Err(CourierError::Config("whatsapp API URL not configured".into()));
        }
        if request.access_token.trim().is_empty() {
            return Err(CourierError::Config(
                "whatsapp access token not configured".into(),
            ));
        }

        let body = SendTextBody::new(&request.to, &request.body);
        debug!("whatsapp: POST {} to={}", request.api_url, request.to);

        let resp = self
            .client
            .post(&request.api_url)
            .header("Authorization", format!("Bearer {}", request.access_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| CourierError::Channel(format!("whatsapp send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(CourierError::Channel(format!(
                "whatsapp send failed ({status}): {error_text}"
            )));
        }

        // The send already succeeded; a malformed response body only costs
        // us the correlation id.
        match resp.json::<SendResponse>().await {
            Ok(parsed) => Ok(parsed.messages.into_iter().next().map(|m| m.id)),
            Err(e) => {
                warn!("whatsapp: failed to parse send response: {e}");
                Ok(None)
            }
        }
    }
}
