//! Store configuration.

use serde::Deserialize;

/// Configuration for a [`SessionStore`](crate::SessionStore).
///
/// Immutable once the store is constructed. Deserializable so it can be
/// embedded in an application config file; every field except `host` has a
/// default matching a local Redis.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Host of the session backend.
    pub host: String,
    /// Port the backend is listening on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Password, when the backend requires authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database index; 0 is the server default and skips SELECT.
    #[serde(default)]
    pub database: u32,
    /// Prefix prepended to session identifiers to form backend keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Time-to-live for stored entries, in seconds. Must be positive.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_port() -> u16 {
    6379
}

fn default_key_prefix() -> String {
    "s:".to_string()
}

fn default_ttl_seconds() -> u64 {
    3600
}

impl StoreConfig {
    /// Creates a configuration for the given host and port with defaults for
    /// everything else.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        StoreConfig {
            host: host.into(),
            port,
            password: None,
            database: 0,
            key_prefix: default_key_prefix(),
            ttl_seconds: default_ttl_seconds(),
        }
    }

    /// Sets the backend password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the logical database index.
    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Sets the key prefix.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Sets the entry time-to-live in seconds.
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.ttl_seconds == 0 {
            return Err("ttl_seconds must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::new("127.0.0.1", default_port())
    }
}
