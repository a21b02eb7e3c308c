//! Display-text extraction over the typed message payload.

use crate::events::{InboundMessage, SharedContact};

/// The known message kinds plus an explicit unknown variant.
///
/// Built from the raw payload by [`InboundMessage::content`]; rendering is
/// an exhaustive match so a new kind fails loudly at the compiler instead
/// of silently.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text {
        body: Option<String>,
    },
    Image {
        caption: Option<String>,
    },
    Video {
        caption: Option<String>,
    },
    Audio,
    Document {
        filename: Option<String>,
        caption: Option<String>,
    },
    Location {
        name: Option<String>,
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    Contacts {
        entries: Vec<SharedContact>,
    },
    Unknown {
        kind: String,
    },
}

impl InboundMessage {
    /// Fold the type tag and its sibling payload field into one sum type.
    ///
    /// A tag whose payload field is structurally absent (e.g. a `location`
    /// message without a location object) degrades to `Unknown`.
    pub fn content(&self) -> MessageContent {
        match self.message_type.as_str() {
            "text" => MessageContent::Text {
                body: self.text.as_ref().map(|t| t.body.clone()),
            },
            "image" => MessageContent::Image {
                caption: self.image.as_ref().and_then(|m| m.caption.clone()),
            },
            "video" => MessageContent::Video {
                caption: self.video.as_ref().and_then(|m| m.caption.clone()),
            },
            "audio" => MessageContent::Audio,
            "document" => MessageContent::Document {
                filename: self.document.as_ref().and_then(|d| d.filename.clone()),
                caption: self.document.as_ref().and_then(|d| d.caption.clone()),
            },
            "location" => match &self.location {
                Some(l) => MessageContent::Location {
                    name: l.name.clone(),
                    address: l.address.clone(),
                    latitude: l.latitude,
                    longitude: l.longitude,
                },
                None => MessageContent::Unknown {
                    kind: "location".to_string(),
                },
            },
            "contacts" => MessageContent::Contacts {
                entries: self.contacts.clone().unwrap_or_default(),
            },
            "" => MessageContent::Unknown {
                kind: "unknown".to_string(),
            },
            other => MessageContent::Unknown {
                kind: other.to_string(),
            },
        }
    }
}

impl MessageContent {
    /// Render a non-empty display string for the chat log.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text { body } => match body.as_deref().filter(|b| !b.trim().is_empty()) {
                Some(body) => body.to_string(),
                None => "[Empty message]".to_string(),
            },
            Self::Image { caption } => placeholder_or_caption("[Image]", caption),
            Self::Video { caption } => placeholder_or_caption("[Video]", caption),
            Self::Audio => "[Audio]".to_string(),
            Self::Document { filename, caption } => {
                let name = filename
                    .as_deref()
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or("Untitled");
                match caption.as_deref().filter(|c| !c.trim().is_empty()) {
                    Some(caption) => format!("[Document: {name}] {caption}"),
                    None => format!("[Document: {name}]"),
                }
            }
            Self::Location {
                name,
                address,
                latitude,
                longitude,
            } => {
                let mut parts = Vec::new();
                if let Some(name) = name.as_deref().filter(|n| !n.trim().is_empty()) {
                    parts.push(name.to_string());
                }
                if let Some(address) = address.as_deref().filter(|a| !a.trim().is_empty()) {
                    parts.push(address.to_string());
                }
                parts.push(format!("{latitude}, {longitude}"));
                format!("[Location: {}]", parts.join(", "))
            }
            Self::Contacts { entries } => {
                let names: Vec<String> = entries.iter().filter_map(contact_display_name).collect();
                if names.is_empty() {
                    "[Contacts]".to_string()
                } else {
                    format!("[Contacts: {}]", names.join(", "))
                }
            }
            Self::Unknown { kind } => format!("[Unsupported: {kind}]"),
        }
    }
}

fn placeholder_or_caption(placeholder: &str, caption: &Option<String>) -> String {
    match caption.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(caption) => caption.to_string(),
        None => placeholder.to_string(),
    }
}

/// First and last name joined, falling back to the formatted name.
fn contact_display_name(contact: &SharedContact) -> Option<String> {
    let name = contact.name.as_ref()?;
    let parts: Vec<&str> = [name.first_name.as_deref(), name.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect();
    if parts.is_empty() {
        return name
            .formatted_name
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(str::to_string);
    }
    Some(parts.join(" "))
}
