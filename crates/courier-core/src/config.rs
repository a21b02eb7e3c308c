use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::CourierError;

/// Top-level Courier configuration (deployment-level settings only).
///
/// Provider credentials and webhook secrets live in the `configurations`
/// table and are resolved per call, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "~/.courier/data/courier.db".to_string()
}

/// Keys of the values resolved from the `configurations` table.
pub mod keys {
    /// Token checked during the webhook subscription handshake.
    pub const VERIFY_TOKEN: &str = "verify_token";
    /// Shared secret checked against the `x-webhook-secret` header.
    pub const WEBHOOK_SECRET: &str = "webhook_secret";
    /// Messaging-provider send endpoint.
    pub const WHATSAPP_API_URL: &str = "whatsapp_api_url";
    /// Messaging-provider bearer token.
    pub const WHATSAPP_ACCESS_TOKEN: &str = "whatsapp_access_token";
    /// Completion-provider API key. Auto-reply is off while unset.
    pub const COMPLETION_API_KEY: &str = "completion_api_key";
    /// Completion model identifier.
    pub const COMPLETION_MODEL: &str = "completion_model";
    /// System prompt prepended to completion calls.
    pub const SYSTEM_PROMPT: &str = "system_prompt";
}

/// Key/value lookup built once per webhook call from the fetched
/// configuration rows. Null and blank values read as absent.
#[derive(Debug, Clone, Default)]
pub struct ConfigMap {
    entries: HashMap<String, String>,
}

impl ConfigMap {
    /// Build from `(key, value)` rows, dropping null/blank values.
    pub fn from_rows(rows: Vec<(String, Option<String>)>) -> Self {
        let entries = rows
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?;
                if value.trim().is_empty() {
                    None
                } else {
                    Some((key, value))
                }
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a value, or fail with a configuration error naming the key.
    pub fn require(&self, key: &str) -> Result<&str, CourierError> {
        self.get(key)
            .ok_or_else(|| CourierError::Config(format!("{key} not configured")))
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, CourierError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| CourierError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CourierError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
