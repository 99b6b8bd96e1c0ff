use cobalt_store::ProxyConfig;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DbError;

fn default_name() -> String {
    "django".to_string()
}

fn default_container() -> String {
    "default".to_string()
}

fn default_partition_key() -> String {
    "id".to_string()
}

/// Called only when the key is present, so any value (`null` included) counts.
fn key_present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

/// Connection settings, read from a JSON object with upper-case keys.
///
/// ```json
/// { "URL": "https://localhost:8081", "KEY": "...", "PARTITION_KEY": "pk" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Collection the default cursor is bound to.
    #[serde(default = "default_container")]
    pub container: String,
    /// Partition discriminator and surrogate row id of every collection.
    #[serde(default = "default_partition_key")]
    pub partition_key: String,
    /// Set when the `PROXY` key is present, whatever its value.
    #[serde(
        default,
        deserialize_with = "key_present",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub proxy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            name: default_name(),
            container: default_container(),
            partition_key: default_partition_key(),
            proxy: false,
            host: None,
            port: None,
        }
    }
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DbError> {
        serde_json::from_str(json)
            .map_err(|e| DbError::Configuration(format!("invalid database settings: {e}")))
    }

    pub fn partition_key(mut self, column: impl Into<String>) -> Self {
        self.partition_key = column.into();
        self
    }

    pub fn validate(&self) -> Result<(), DbError> {
        if self.url.is_empty() {
            return Err(DbError::Configuration(
                "settings.DATABASES is missing URL".into(),
            ));
        }
        if self.key.is_empty() {
            return Err(DbError::Configuration(
                "settings.DATABASES is missing KEY".into(),
            ));
        }
        if self.partition_key.is_empty() {
            return Err(DbError::Configuration(
                "PARTITION_KEY must name a column".into(),
            ));
        }
        Ok(())
    }

    /// Proxy passed to the connector, present only when `PROXY` is set.
    pub fn proxy_config(&self) -> Option<ProxyConfig> {
        self.proxy.then(|| ProxyConfig {
            host: self.host.clone(),
            port: self.port,
        })
    }
}
