//! swcache server entry point.
//!
//! Loads configuration, opens the store database, optionally registers the
//! controller and serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{CacheController, FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(store = %config.store_name(), origin = %config.origin, "Starting swcache server on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let controller = Arc::new(CacheController::new(&config, db, Arc::new(fetcher))?);

    if config.auto_register {
        match controller.register().await {
            Ok((installed, activated)) => tracing::info!(
                seeded = installed.seeded.len(),
                failed = installed.failed.len(),
                deleted = activated.deleted.len(),
                "registered"
            ),
            Err(e) => tracing::error!(error = %e, "registration failed, use sw_install/sw_activate to retry"),
        }
    }

    let handler = handler::SwCacheServer::new(controller);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
