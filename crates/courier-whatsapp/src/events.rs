//! WhatsApp Cloud API webhook deserialization types.
//!
//! Payload reference: <https://developers.facebook.com/docs/whatsapp/cloud-api/webhooks/payload-examples>

use serde::Deserialize;

/// Expected top-level object discriminator on every envelope.
pub const WEBHOOK_OBJECT: &str = "whatsapp_business_account";

/// Change field carrying inbound messages.
pub const FIELD_MESSAGES: &str = "messages";

/// Change field carrying delivery-status updates.
pub const FIELD_MESSAGE_STATUS: &str = "message_status";

/// Top-level webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// A single entry in the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    /// WhatsApp Business Account id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

/// A change within an entry, dispatched on `field`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    pub value: EventValue,
}

/// The change value carrying messages, sender profiles, or statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct EventValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub contacts: Vec<SenderProfile>,
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
    pub metadata: Option<EventMetadata>,
}

/// Metadata about the receiving business phone number.
#[derive(Debug, Clone, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub display_phone_number: String,
    #[serde(default)]
    pub phone_number_id: String,
}

/// Profile data the provider supplies alongside inbound messages.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderProfile {
    /// WhatsApp id — the sender phone number.
    #[serde(default)]
    pub wa_id: String,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
}

/// A single inbound message.
///
/// The `type` tag names which of the sibling payload fields is populated;
/// [`InboundMessage::content`] folds them into one sum type.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number.
    #[serde(default)]
    pub from: String,
    /// Provider-assigned message id.
    #[serde(default)]
    pub id: String,
    /// Unix timestamp as a string.
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    pub text: Option<TextBody>,
    pub image: Option<MediaAttachment>,
    pub video: Option<MediaAttachment>,
    pub audio: Option<MediaAttachment>,
    pub document: Option<DocumentAttachment>,
    pub location: Option<LocationInfo>,
    pub contacts: Option<Vec<SharedContact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

/// Media payload (image, video, audio).
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAttachment {
    #[serde(default)]
    pub id: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentAttachment {
    #[serde(default)]
    pub id: String,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub address: Option<String>,
}

/// A contact card embedded in a `contacts` message.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedContact {
    pub name: Option<ContactName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactName {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub formatted_name: Option<String>,
}

/// A delivery-status callback for a previously sent or received message.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    /// Provider message id this status refers to.
    #[serde(default)]
    pub id: String,
    /// Status string: "sent", "delivered", "read", or anything else.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub recipient_id: String,
}

impl EventValue {
    /// The profile name supplied for a sender phone number, if any.
    pub fn profile_name(&self, phone: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.wa_id == phone)
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_message_envelope() {
        let json = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102290129340398",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "15550000000",
                            "phone_number_id": "106540352242922"
                        },
                        "contacts": [{
                            "wa_id": "+51999999999",
                            "profile": {"name": "Maria"}
                        }],
                        "messages": [{
                            "from": "+51999999999",
                            "id": "wamid.HBgL",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": "hola"}
                        }]
                    }
                }]
            }]
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.object, WEBHOOK_OBJECT);
        let change = &envelope.entry[0].changes[0];
        assert_eq!(change.field, FIELD_MESSAGES);

        let msg = &change.value.messages[0];
        assert_eq!(msg.from, "+51999999999");
        assert_eq!(msg.message_type, "text");
        assert_eq!(msg.text.as_ref().unwrap().body, "hola");
        assert_eq!(change.value.profile_name("+51999999999"), Some("Maria"));
        assert_eq!(change.value.profile_name("+10000000000"), None);
    }

    #[test]
    fn test_parse_status_envelope() {
        let json = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "102290129340398",
                "changes": [{
                    "field": "message_status",
                    "value": {
                        "statuses": [{
                            "id": "wamid.HBgL",
                            "status": "read",
                            "timestamp": "1700000100",
                            "recipient_id": "+51999999999"
                        }]
                    }
                }]
            }]
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        let change = &envelope.entry[0].changes[0];
        assert_eq!(change.field, FIELD_MESSAGE_STATUS);
        assert!(change.value.messages.is_empty());
        assert_eq!(change.value.statuses[0].status, "read");
        assert_eq!(change.value.statuses[0].id, "wamid.HBgL");
    }

    #[test]
    fn test_parse_tolerates_missing_optional_fields() {
        // No contacts, no metadata, unknown message type with no payload.
        let json = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "+51999999999",
                            "id": "wamid.X",
                            "timestamp": "1700000000",
                            "type": "sticker"
                        }]
                    }
                }]
            }]
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        let msg = &envelope.entry[0].changes[0].value.messages[0];
        assert_eq!(msg.message_type, "sticker");
        assert!(msg.text.is_none());
    }
}
