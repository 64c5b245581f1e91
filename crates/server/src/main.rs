//! blogsphere-sw entry point.
//!
//! Boots configuration, the cache store and the network client, resumes or
//! installs the configured version, then serves host events as MCP tools on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use blogsphere_client::{FetchClient, FetchConfig};
use blogsphere_core::{AppConfig, CacheDb};
use blogsphere_worker::{Connectivity, Deployment, EmptyOutbox, InMemoryHost, Registration, WorkerContext};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
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

    let config = AppConfig::load().context("loading configuration")?;
    let deployment = Deployment::from_config(&config)?;
    tracing::info!(
        origin = %deployment.origin,
        version = %deployment.version,
        db = %config.db_path.display(),
        "Starting blogsphere-sw on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;

    let mut fetch_config = FetchConfig::new(deployment.origin.clone());
    fetch_config.user_agent = config.user_agent.clone();
    fetch_config.timeout = config.timeout();
    fetch_config.max_redirects = config.max_redirects;
    let network = FetchClient::new(fetch_config)?;

    let (host, events) = InMemoryHost::new();
    let host = Arc::new(host);
    let ctx = WorkerContext {
        db,
        network: Arc::new(network),
        clients: host.clone(),
        notifier: host.clone(),
        connectivity: Connectivity::default(),
        outbox: Arc::new(EmptyOutbox),
    };
    let registration = Arc::new(Registration::new(ctx));

    // A version recorded in the store resumes control even if this install fails.
    if let Err(e) = registration.register(deployment.clone()).await {
        match registration.controller().await {
            Some(worker) => tracing::error!(error = %e, worker = %worker.id(), "install failed; previous version keeps serving"),
            None => tracing::error!(error = %e, "install failed; requests pass through to the network"),
        }
    }

    let bridge = Arc::new(tools::HostBridge::new(registration, host, deployment.origin, events));
    let handler = handler::BlogSphereServer::new(bridge);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
