//! # linkheart-server
//!
//! HTTP backend for the LinkHeart dating demo.
//!
//! This binary provides:
//! - **REST API** (axum) for discovery, swiping, matches, chat and profiles
//! - **SSE conversation stream** pushing new messages and read receipts
//! - **Admin API** (bearer token) for statistics, forced matches and reset

mod api;
mod config;
mod error;
mod stream;

use std::sync::Arc;
use std::time::Instant;

use linkheart_store::{Backend, Database, MemoryBackend, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{ServerConfig, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,linkheart_server=debug,linkheart_store=debug")
            }),
        )
        .init();

    info!("Starting LinkHeart server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        addr = %config.http_addr,
        storage = ?config.storage,
        lenient_load = config.lenient_load,
        admin_enabled = config.admin_token.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the store (seeds the demo dataset on first start)
    // -----------------------------------------------------------------------
    let store = Arc::new(open_store(&config)?);
    let stats = store.stats()?;
    info!(
        users = stats.users,
        swipes = stats.swipes,
        matches = stats.matches,
        messages = stats.messages,
        "Store ready"
    );

    let http_addr = config.http_addr;
    let app_state = AppState {
        store,
        config: Arc::new(config),
        started_at: Instant::now(),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

fn open_store(config: &ServerConfig) -> anyhow::Result<Store> {
    let backend: Arc<dyn Backend> = match &config.storage {
        Storage::Memory => Arc::new(MemoryBackend::new()),
        Storage::DefaultPath => Arc::new(Database::new()?),
        Storage::Path(path) => Arc::new(Database::open_at(path)?),
    };
    Ok(Store::open(backend, config.store_config())?)
}
