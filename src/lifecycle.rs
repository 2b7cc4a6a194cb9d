// src/lifecycle.rs
// Process start order and graceful shutdown (spec §4.H).

use crate::bridge::Bridge;
use crate::mcp::GatewayServer;
use crate::CONFIG;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DRAIN_GRACE: Duration = Duration::from_secs(2);

pub async fn run(port: u16) -> Result<()> {
    // (i) resilience kit singletons are process-global and initialize
    // lazily on first use (see resilience::BREAKER).

    // (ii) bridge election.
    let bridge = Arc::new(Bridge::bootstrap(port, CONFIG.token.clone(), &CONFIG.agent_name).await);
    info!(mode = bridge.mode(), "bridge election complete");

    // (iii) connect the MCP server to stdio.
    let server = GatewayServer::new(bridge.clone());
    let service = server.serve(rmcp::transport::stdio()).await?;

    // (iv) install signal handlers and race them against the server loop.
    tokio::select! {
        result = service.waiting() => {
            if let Err(e) = result {
                error!(error = %e, "mcp server exited with an error");
            }
        }
        _ = wait_for_shutdown_signal() => {
            info!("shutdown signal received, draining in-flight requests");
        }
    }

    tokio::time::sleep(DRAIN_GRACE).await;
    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
