//! Webhook event processing — the ingestion path from parsed envelope to
//! persisted chat rows and optional auto-reply.

use std::sync::Arc;

use courier_core::config::{keys, ConfigMap};
use courier_core::error::CourierError;
use courier_core::model::DeliveryStatus;
use courier_core::traits::{CompletionProvider, CompletionRequest, OutboundSender, SendRequest};
use courier_store::{StatusApply, Store};
use courier_whatsapp::events::{
    EventValue, InboundMessage, WebhookEnvelope, FIELD_MESSAGES, FIELD_MESSAGE_STATUS,
    WEBHOOK_OBJECT,
};
use serde_json::json;
use tracing::{debug, error, info};

/// Model used when `completion_model` is not configured.
const DEFAULT_COMPLETION_MODEL: &str = "gpt-4";

/// Dispatches parsed webhook envelopes to message and status handling.
///
/// Holds injected handles: the store plus the completion and sender
/// collaborators, so tests can substitute fakes.
pub struct EventProcessor {
    store: Store,
    completion: Arc<dyn CompletionProvider>,
    sender: Arc<dyn OutboundSender>,
}

impl EventProcessor {
    pub fn new(
        store: Store,
        completion: Arc<dyn CompletionProvider>,
        sender: Arc<dyn OutboundSender>,
    ) -> Self {
        Self {
            store,
            completion,
            sender,
        }
    }

    /// Process one webhook envelope.
    ///
    /// Fails fast on an unexpected object discriminator, before anything is
    /// persisted. Per-item failures inside a batch are logged and swallowed;
    /// the call succeeds whenever dispatch itself completed.
    pub async fn process(
        &self,
        envelope: &WebhookEnvelope,
        config: &ConfigMap,
    ) -> Result<(), CourierError> {
        if envelope.object != WEBHOOK_OBJECT {
            return Err(CourierError::Channel(format!(
                "unexpected webhook object '{}'",
                envelope.object
            )));
        }

        for entry in &envelope.entry {
            for change in &entry.changes {
                match change.field.as_str() {
                    FIELD_MESSAGES => self.handle_messages(&change.value, config).await,
                    FIELD_MESSAGE_STATUS => self.handle_statuses(&change.value).await,
                    other => debug!("ignoring change field '{other}'"),
                }
            }
        }

        Ok(())
    }

    /// Handle every message in a `messages` change, in payload order.
    async fn handle_messages(&self, value: &EventValue, config: &ConfigMap) {
        for message in &value.messages {
            if let Err(e) = self.handle_message(message, value, config).await {
                error!("failed to process message {}: {e}", message.id);
            }
        }
    }

    async fn handle_message(
        &self,
        message: &InboundMessage,
        value: &EventValue,
        config: &ConfigMap,
    ) -> Result<(), CourierError> {
        let contact = self
            .store
            .resolve_contact(&message.from, value.profile_name(&message.from))
            .await?;

        let text = message.content().display_text();
        let metadata = json!({
            "type": message.message_type,
            "timestamp": message.timestamp,
        });

        let inserted = self
            .store
            .insert_incoming(&contact.id, &text, &message.id, &metadata)
            .await?;
        if inserted.is_none() {
            debug!("duplicate delivery of {}, skipping", message.id);
            return Ok(());
        }

        info!("[{}] stored incoming message {}", message.from, message.id);

        // Auto-reply is on only while a completion key is configured.
        let Some(api_key) = config.get(keys::COMPLETION_API_KEY) else {
            return Ok(());
        };

        let request = CompletionRequest {
            api_key: api_key.to_string(),
            model: config
                .get(keys::COMPLETION_MODEL)
                .unwrap_or(DEFAULT_COMPLETION_MODEL)
                .to_string(),
            system_prompt: config.get(keys::SYSTEM_PROMPT).unwrap_or_default().to_string(),
            text,
        };
        let reply = self.completion.complete(&request).await?;

        let send = SendRequest {
            api_url: config.require(keys::WHATSAPP_API_URL)?.to_string(),
            access_token: config.require(keys::WHATSAPP_ACCESS_TOKEN)?.to_string(),
            to: contact.phone_number.clone(),
            body: reply.clone(),
        };
        let reply_id = self.sender.send_text(&send).await?;

        let reply_metadata = json!({
            "type": "text",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.store
            .insert_outgoing(&contact.id, &reply, reply_id.as_deref(), &reply_metadata)
            .await?;

        info!("[{}] sent auto-reply via {}", message.from, self.sender.name());

        Ok(())
    }

    /// Handle every status in a `message_status` change.
    async fn handle_statuses(&self, value: &EventValue) {
        for status in &value.statuses {
            let mapped = DeliveryStatus::from_provider(&status.status);
            match self.store.apply_status(&status.id, mapped).await {
                Ok(StatusApply::Advanced) => {
                    debug!("message {} advanced to {}", status.id, mapped.as_str());
                }
                Ok(StatusApply::Unchanged) => {
                    debug!("message {} already at or past {}", status.id, mapped.as_str());
                }
                Ok(StatusApply::NotFound) => {
                    debug!("no stored message for status callback {}", status.id);
                }
                Err(e) => {
                    error!("failed to apply status for {}: {e}", status.id);
                }
            }
        }
    }
}
