//! Contact lookup, creation, and opportunistic name fill.

use super::Store;
use courier_core::{error::CourierError, model::Contact};
use uuid::Uuid;

type ContactRow = (String, String, Option<String>, Option<String>, String, String);

fn row_to_contact(row: ContactRow) -> Contact {
    let (id, phone_number, name, avatar_url, created_at, updated_at) = row;
    Contact {
        id,
        phone_number,
        name,
        avatar_url,
        created_at,
        updated_at,
    }
}

impl Store {
    /// Find a contact by its phone number.
    pub async fn find_contact_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Contact>, CourierError> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, phone_number, name, avatar_url, created_at, updated_at \
             FROM contacts WHERE phone_number = ?",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(row.map(row_to_contact))
    }

    /// Create a contact with an optional display name.
    pub async fn create_contact(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Contact, CourierError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO contacts (id, phone_number, name) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(phone)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| CourierError::Store(format!("insert failed: {e}")))?;

        self.find_contact_by_phone(phone).await?.ok_or_else(|| {
            CourierError::Store(format!("contact {phone} missing after insert"))
        })
    }

    /// Get or create the contact for a sender phone number.
    ///
    /// A profile name from the provider fills a missing stored name but
    /// never overwrites one that is already set.
    pub async fn resolve_contact(
        &self,
        phone: &str,
        profile_name: Option<&str>,
    ) -> Result<Contact, CourierError> {
        if let Some(existing) = self.find_contact_by_phone(phone).await? {
            if existing.name.is_none() {
                if let Some(name) = profile_name.filter(|n| !n.trim().is_empty()) {
                    sqlx::query(
                        "UPDATE contacts SET name = ?, updated_at = datetime('now') \
                         WHERE id = ? AND name IS NULL",
                    )
                    .bind(name)
                    .bind(&existing.id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| CourierError::Store(format!("update failed: {e}")))?;

                    return Ok(Contact {
                        name: Some(name.to_string()),
                        ..existing
                    });
                }
            }
            return Ok(existing);
        }

        self.create_contact(phone, profile_name.filter(|n| !n.trim().is_empty()))
            .await
    }
}
