use serde::{Deserialize, Serialize};

/// Direction of a chat message relative to this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incoming" => Some(Self::Incoming),
            "outgoing" => Some(Self::Outgoing),
            _ => None,
        }
    }
}

/// Delivery lifecycle of a chat message: `sent` → `delivered` → `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Map a provider status string. Unrecognized strings (e.g. `failed`)
    /// fall back to `sent` rather than failing.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            _ => Self::Sent,
        }
    }

    /// Position in the forward progression, for monotonic updates.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }
}

/// A contact, keyed by phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of the append-only chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub contact_id: String,
    pub message: String,
    pub direction: Direction,
    pub status: DeliveryStatus,
    /// Provider-assigned message id; the correlation key for status updates.
    pub provider_message_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_from_provider() {
        assert_eq!(
            DeliveryStatus::from_provider("delivered"),
            DeliveryStatus::Delivered
        );
        assert_eq!(DeliveryStatus::from_provider("read"), DeliveryStatus::Read);
        assert_eq!(DeliveryStatus::from_provider("sent"), DeliveryStatus::Sent);
        // Unknown strings default to sent instead of failing.
        assert_eq!(
            DeliveryStatus::from_provider("failed"),
            DeliveryStatus::Sent
        );
        assert_eq!(DeliveryStatus::from_provider(""), DeliveryStatus::Sent);
    }

    #[test]
    fn test_status_rank_is_monotonic() {
        assert!(DeliveryStatus::Sent.rank() < DeliveryStatus::Delivered.rank());
        assert!(DeliveryStatus::Delivered.rank() < DeliveryStatus::Read.rank());
    }

    #[test]
    fn test_direction_round_trip() {
        for d in [Direction::Incoming, Direction::Outgoing] {
            assert_eq!(Direction::parse(d.as_str()), Some(d));
        }
        assert_eq!(Direction::parse("sideways"), None);
    }
}
