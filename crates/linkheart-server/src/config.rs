//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use linkheart_shared::constants::{APP_NAME, DEFAULT_EVENT_CAPACITY, DEFAULT_HTTP_PORT};
use linkheart_store::{LoadMode, StoreConfig};

/// Where the collections are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// SQLite file in the platform data directory.
    DefaultPath,
    /// SQLite file at an explicit path.
    Path(PathBuf),
    /// Process memory; everything is lost on exit.
    Memory,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Env: `DATABASE_PATH` (`:memory:` for an in-memory store)
    /// Default: platform data directory.
    pub storage: Storage,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"LinkHeart"`
    pub instance_name: String,

    /// Admin API bearer token. Required to access /admin/* and /reset.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Treat unreadable collections as empty instead of failing requests.
    /// Env: `LENIENT_LOAD` (true/false)
    /// Default: `false`
    pub lenient_load: bool,

    /// Events buffered per stream subscriber.
    /// Env: `EVENT_CAPACITY`
    /// Default: `256`
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            storage: Storage::DefaultPath,
            instance_name: APP_NAME.to_string(),
            admin_token: None,
            lenient_load: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.storage = match path.trim() {
                "" => Storage::DefaultPath,
                ":memory:" => Storage::Memory,
                p => Storage::Path(PathBuf::from(p)),
            };
        }

        if let Some(name) = var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(token) = var("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(val) = var("LENIENT_LOAD") {
            config.lenient_load = val == "true" || val == "1";
        }

        if let Some(val) = var("EVENT_CAPACITY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.event_capacity = n,
                _ => tracing::warn!(value = %val, "Invalid EVENT_CAPACITY, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            load_mode: if self.lenient_load {
                LoadMode::Lenient
            } else {
                LoadMode::Strict
            },
            event_capacity: self.event_capacity,
            seed_if_empty: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.storage, Storage::DefaultPath);
        assert!(config.admin_token.is_none());
        assert_eq!(config.store_config().load_mode, LoadMode::Strict);
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/var/lib/linkheart/db.sqlite"),
            ("ADMIN_TOKEN", "s3cret"),
            ("LENIENT_LOAD", "true"),
            ("EVENT_CAPACITY", "16"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(
            config.storage,
            Storage::Path(PathBuf::from("/var/lib/linkheart/db.sqlite"))
        );
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(config.store_config().load_mode, LoadMode::Lenient);
        assert_eq!(config.store_config().event_capacity, 16);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("EVENT_CAPACITY", "0"),
            ("ADMIN_TOKEN", ""),
            ("DATABASE_PATH", ":memory:"),
        ]);
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert!(config.admin_token.is_none());
        assert_eq!(config.storage, Storage::Memory);
    }
}
