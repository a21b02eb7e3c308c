//! The append-only chat log and delivery-status updates.

use super::Store;
use courier_core::{
    error::CourierError,
    model::{ChatRecord, DeliveryStatus, Direction},
};
use uuid::Uuid;

/// Outcome of applying a provider status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusApply {
    /// The status advanced and the row was updated.
    Advanced,
    /// The update did not advance the status and was ignored.
    Unchanged,
    /// No chat row carries this provider message id.
    NotFound,
}

type ChatRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn row_to_chat(row: ChatRow) -> ChatRecord {
    let (id, contact_id, message, direction, status, provider_message_id, metadata, created_at, updated_at) =
        row;
    ChatRecord {
        id,
        contact_id,
        message,
        direction: Direction::parse(&direction).unwrap_or(Direction::Incoming),
        status: DeliveryStatus::from_provider(&status),
        provider_message_id,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at,
        updated_at,
    }
}

impl Store {
    /// Store an inbound message with status `delivered`.
    ///
    /// Returns `None` without inserting when the provider message id has
    /// been seen before (provider retries deliver the same id).
    pub async fn insert_incoming(
        &self,
        contact_id: &str,
        message: &str,
        provider_message_id: &str,
        metadata: &serde_json::Value,
    ) -> Result<Option<String>, CourierError> {
        let seen: Option<(String,)> = sqlx::query_as("SELECT id FROM chats WHERE message_id = ?")
            .bind(provider_message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        if seen.is_some() {
            return Ok(None);
        }

        let id = Uuid::new_v4().to_string();
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| CourierError::Store(format!("serialize failed: {e}")))?;

        sqlx::query(
            "INSERT INTO chats (id, contact_id, message, direction, status, message_id, metadata) \
             VALUES (?, ?, ?, 'incoming', 'delivered', ?, ?)",
        )
        .bind(&id)
        .bind(contact_id)
        .bind(message)
        .bind(provider_message_id)
        .bind(&metadata_json)
        .execute(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("insert failed: {e}")))?;

        Ok(Some(id))
    }

    /// Store an outgoing message with status `sent`.
    pub async fn insert_outgoing(
        &self,
        contact_id: &str,
        message: &str,
        provider_message_id: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<String, CourierError> {
        let id = Uuid::new_v4().to_string();
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| CourierError::Store(format!("serialize failed: {e}")))?;

        sqlx::query(
            "INSERT INTO chats (id, contact_id, message, direction, status, message_id, metadata) \
             VALUES (?, ?, ?, 'outgoing', 'sent', ?, ?)",
        )
        .bind(&id)
        .bind(contact_id)
        .bind(message)
        .bind(provider_message_id)
        .bind(&metadata_json)
        .execute(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("insert failed: {e}")))?;

        Ok(id)
    }

    /// Apply a provider status update to the chat row carrying this
    /// provider message id.
    ///
    /// Progression is monotonic: `sent < delivered < read`. Updates that do
    /// not advance the stored status are ignored, so re-applied or
    /// out-of-order callbacks never regress an already-`read` message.
    pub async fn apply_status(
        &self,
        provider_message_id: &str,
        status: DeliveryStatus,
    ) -> Result<StatusApply, CourierError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, status FROM chats WHERE message_id = ?")
                .bind(provider_message_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        let Some((id, current)) = row else {
            return Ok(StatusApply::NotFound);
        };

        if status.rank() <= DeliveryStatus::from_provider(&current).rank() {
            return Ok(StatusApply::Unchanged);
        }

        sqlx::query("UPDATE chats SET status = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(status.as_str())
            .bind(&id)
            .execute(&self.pool)
            .await
            .map_err(|e| CourierError::Store(format!("update failed: {e}")))?;

        Ok(StatusApply::Advanced)
    }

    /// Find a chat row by its provider message id.
    pub async fn find_chat_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<ChatRecord>, CourierError> {
        let row: Option<ChatRow> = sqlx::query_as(
            "SELECT id, contact_id, message, direction, status, message_id, metadata, \
             created_at, updated_at FROM chats WHERE message_id = ?",
        )
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(row.map(row_to_chat))
    }

    /// All chat rows for a contact in insertion order.
    pub async fn chats_for_contact(
        &self,
        contact_id: &str,
    ) -> Result<Vec<ChatRecord>, CourierError> {
        let rows: Vec<ChatRow> = sqlx::query_as(
            "SELECT id, contact_id, message, direction, status, message_id, metadata, \
             created_at, updated_at FROM chats WHERE contact_id = ? \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(rows.into_iter().map(row_to_chat).collect())
    }
}
