//! Key/value configuration rows.

use super::Store;
use courier_core::{config::ConfigMap, error::CourierError};
use uuid::Uuid;

impl Store {
    /// Fetch all configuration rows reduced to a lookup map.
    pub async fn config_map(&self) -> Result<ConfigMap, CourierError> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT key, value FROM configurations")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(ConfigMap::from_rows(rows))
    }

    /// Get a single configuration value by key.
    pub async fn config_value(&self, key: &str) -> Result<Option<String>, CourierError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT value FROM configurations WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(row.and_then(|(v,)| v))
    }

    /// Set a configuration value (upsert by key).
    pub async fn set_config(
        &self,
        key: &str,
        value: Option<&str>,
        description: &str,
    ) -> Result<(), CourierError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO configurations (id, key, value, description) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             description = excluded.description, updated_at = datetime('now')",
        )
        .bind(&id)
        .bind(key)
        .bind(value)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("upsert config failed: {e}")))?;

        Ok(())
    }

    /// List all configuration rows as `(key, value, description)`.
    pub async fn list_configs(
        &self,
    ) -> Result<Vec<(String, Option<String>, String)>, CourierError> {
        let rows: Vec<(String, Option<String>, String)> =
            sqlx::query_as("SELECT key, value, description FROM configurations ORDER BY key")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| CourierError::Store(format!("query failed: {e}")))?;

        Ok(rows)
    }
}
