// src/bridge/mod.rs
// Hub/Peer election and the unified `call_tool` entrypoint the MCP server
// dispatches through (spec §4.F, §9 "Hub/Peer election").

pub mod context;
pub mod hub;
pub mod message;
pub mod peer;
pub mod pending;

use hub::Hub;
use peer::Peer;
use rand::RngCore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use self::pending::PendingOutcome;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("no browser is connected")]
    BrowserDisconnected,
    #[error("lost connection to the hub")]
    ConnectionLost,
    #[error("gave up reconnecting to the hub")]
    RetryExhausted,
    #[error("too many in-flight requests")]
    Overloaded,
    #[error("internal bridge error")]
    Internal,
}

/// The daemon's role after election, or the degraded fallback when neither
/// succeeds (spec §9 "Graceful degradation").
pub enum Bridge {
    Hub(Arc<Hub>),
    Peer(Arc<Peer>),
    Disconnected,
}

impl Bridge {
    /// Race to bind the fixed localhost port; the winner becomes Hub, the
    /// loser attempts to join as Peer. If Peer join also fails, the bridge
    /// falls back to a degraded stdio-only state.
    pub async fn bootstrap(port: u16, token: Option<String>, agent_name: &str) -> Self {
        match std::net::TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let token = token.unwrap_or_else(generate_token);
                info!(port, %token, "started as hub; bridge auth token generated for this run");
                Bridge::Hub(Hub::serve(listener, token))
            }
            Err(_) => {
                let url = format!("ws://127.0.0.1:{port}/");
                let token = token.unwrap_or_default();
                match Peer::connect(&url, &token, agent_name).await {
                    Some(peer) => {
                        info!(port, "joined existing hub as peer");
                        Bridge::Peer(peer)
                    }
                    None => {
                        warn!(port, "could not bind or join the bridge port; running stdio-only");
                        Bridge::Disconnected
                    }
                }
            }
        }
    }

    pub async fn call_tool(&self, method: &str, params: Value, agent_name: &str) -> Result<PendingOutcome, BridgeError> {
        match self {
            Bridge::Hub(hub) => hub.call_tool(method, params, agent_name, None).await?.wait().await,
            Bridge::Peer(peer) => peer.call_tool(method, params, agent_name).await?.wait().await,
            Bridge::Disconnected => Err(BridgeError::BrowserDisconnected),
        }
    }

    pub fn is_browser_connected(&self) -> bool {
        match self {
            Bridge::Hub(hub) => hub.has_browser(),
            Bridge::Peer(peer) => peer.context.current().is_some(),
            Bridge::Disconnected => false,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Bridge::Hub(_) => "hub",
            Bridge::Peer(_) => "peer",
            Bridge::Disconnected => "unknown",
        }
    }

    pub fn current_context(&self) -> Option<context::CodebaseContext> {
        match self {
            Bridge::Hub(hub) => hub.context.current(),
            Bridge::Peer(peer) => peer.context.current(),
            Bridge::Disconnected => None,
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
