// src/bridge/hub.rs
// The Hub role: owns the browser connection, accepts Peer connections,
// broadcasts context, and routes requests/responses (spec §4.F).
//
// Grounded on the teacher's axum WebSocket handler
// (`api/ws/chat/mod.rs::ws_chat_handler`/`handle_socket`): split sink/
// stream, a receive loop matching `Message::Text/Ping/Close`, and an
// `Arc<Mutex<_>>`-wrapped sender shared between the read loop and anything
// that needs to push frames back out.

use super::context::ContextStore;
use super::message::{self, HandshakeAck, HandshakeNack, IncomingMessage, Request, Response};
use super::pending::{PendingOutcome, PendingTable};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use governor::{Quota, RateLimiter};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
const RATE_LIMIT_PER_SEC: u32 = 50;

lazy_static! {
    static ref LOCAL_ORIGIN: Regex =
        Regex::new(r"^https?://(localhost|127\.0\.0\.1)(:\d+)?$").expect("origin pattern is valid");
}

struct PeerHandle {
    agent_name: String,
    outbox: mpsc::UnboundedSender<WsMessage>,
}

struct BrowserHandle {
    outbox: mpsc::UnboundedSender<WsMessage>,
}

pub struct Hub {
    token: String,
    peers: Mutex<HashMap<Uuid, PeerHandle>>,
    browser: Mutex<Option<BrowserHandle>>,
    pub context: ContextStore,
    /// Correlates requests this Hub originates on behalf of its own
    /// co-resident MCP server (peer_id = None).
    pending: Arc<PendingTable>,
}

impl Hub {
    fn new(token: String) -> Arc<Self> {
        Arc::new(Self {
            token,
            peers: Mutex::new(HashMap::new()),
            browser: Mutex::new(None),
            context: ContextStore::new(),
            pending: Arc::new(PendingTable::new()),
        })
    }

    /// Bind an already-acquired listener and start serving. The listener
    /// must have been obtained via an atomic OS-level bind so two
    /// simultaneously starting daemons cannot both become Hub.
    pub fn serve(listener: std::net::TcpListener, token: String) -> Arc<Self> {
        let hub = Self::new(token);
        listener.set_nonblocking(true).expect("set_nonblocking");
        let tokio_listener = TcpListener::from_std(listener).expect("adopt std listener");

        let app = Router::new()
            .route("/", get(ws_upgrade_handler))
            .with_state(hub.clone());

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                tokio_listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                warn!(error = %e, "hub websocket server exited");
            }
        });

        hub
    }

    /// Forward a tool call to the browser, on behalf of either this Hub's
    /// own local MCP server (`peer_id = None`) or a connected Peer.
    pub async fn call_tool(
        &self,
        method: &str,
        params: Value,
        agent_name: &str,
        peer_id: Option<String>,
    ) -> Result<oneshot_compat::Receiver, super::BridgeError> {
        let outbox = {
            let browser = self.browser.lock();
            let Some(browser) = browser.as_ref() else {
                return Err(super::BridgeError::BrowserDisconnected);
            };
            browser.outbox.clone()
        };

        let id = Uuid::new_v4().to_string();
        let request = Request {
            id: id.clone(),
            method: method.to_string(),
            params,
            agent_name: agent_name.to_string(),
            peer_id: peer_id.clone(),
        };

        let rx = if peer_id.is_none() {
            Some(
                self.pending
                    .register(id.clone())
                    .await
                    .map_err(|_| super::BridgeError::Overloaded)?,
            )
        } else {
            None
        };

        let frame = serde_json::to_string(&request).expect("request serializes");
        if outbox.send(WsMessage::Text(frame.into())).is_err() {
            return Err(super::BridgeError::BrowserDisconnected);
        }

        Ok(oneshot_compat::Receiver { inner: rx, id })
    }

    async fn handle_browser_response(&self, response: Response) {
        match &response.peer_id {
            Some(peer_id) => {
                let Ok(uuid) = Uuid::parse_str(peer_id) else {
                    return;
                };
                let peers = self.peers.lock();
                if let Some(peer) = peers.get(&uuid) {
                    let frame = serde_json::to_string(&response).expect("response serializes");
                    let _ = peer.outbox.send(WsMessage::Text(frame.into()));
                }
            }
            None => {
                let outcome = match response.error {
                    Some(error) => PendingOutcome::Error(error),
                    None => PendingOutcome::Result(response.result.unwrap_or(Value::Null)),
                };
                self.pending.resolve(&response.id, outcome).await;
            }
        }
    }

    async fn set_browser(&self, outbox: mpsc::UnboundedSender<WsMessage>) {
        info!("browser connected, replacing any previous browser connection");
        let mut slot = self.browser.lock();
        *slot = Some(BrowserHandle { outbox });
    }

    async fn clear_browser(&self) {
        let mut slot = self.browser.lock();
        *slot = None;
        self.context.clear();
        info!("browser disconnected; context cleared");
    }

    async fn register_peer(&self, agent_name: String, outbox: mpsc::UnboundedSender<WsMessage>) -> Uuid {
        let peer_id = Uuid::new_v4();
        self.peers.lock().insert(peer_id, PeerHandle { agent_name, outbox });
        peer_id
    }

    async fn remove_peer(&self, peer_id: Uuid) {
        self.peers.lock().remove(&peer_id);
    }

    async fn broadcast_context(&self, params: Value) {
        let peers = self.peers.lock();
        let push = serde_json::json!({ "type": "context_push", "params": params });
        let frame = serde_json::to_string(&push).expect("context push serializes");
        for peer in peers.values() {
            let _ = peer.outbox.send(WsMessage::Text(frame.clone().into()));
        }
    }

    pub fn has_browser(&self) -> bool {
        // Cheap best-effort check for the health resource; exact consistency
        // is not required there.
        self.browser.try_lock().map(|g| g.is_some()).unwrap_or(true)
    }
}

/// Thin wrapper so `Bridge::call_tool` has a single await point regardless
/// of whether the response is correlated locally (Hub, peer_id = None) or
/// arrives over the wire (Peer).
pub mod oneshot_compat {
    use super::{PendingOutcome};
    use tokio::sync::oneshot;

    pub struct Receiver {
        pub(super) inner: Option<oneshot::Receiver<PendingOutcome>>,
        pub(super) id: String,
    }

    impl Receiver {
        pub async fn wait(self) -> Result<PendingOutcome, crate::bridge::BridgeError> {
            match self.inner {
                Some(rx) => rx.await.map_err(|_| crate::bridge::BridgeError::Internal),
                None => Err(crate::bridge::BridgeError::Internal),
            }
        }

        pub fn id(&self) -> &str {
            &self.id
        }
    }
}

fn origin_is_local(headers: &HeaderMap) -> bool {
    match headers.get(axum::http::header::ORIGIN) {
        None => true,
        Some(value) => value
            .to_str()
            .map(|s| LOCAL_ORIGIN.is_match(s))
            .unwrap_or(false),
    }
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<Hub>>,
    ConnectInfo(_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !origin_is_local(&headers) {
        warn!("rejecting websocket connection with non-local origin");
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_connection(socket, hub))
}

async fn handle_connection(socket: WebSocket, hub: Arc<Hub>) {
    use futures_util::{SinkExt, StreamExt};

    let (mut sink, mut stream) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<WsMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let limiter = RateLimiter::direct(Quota::per_second(
        NonZeroU32::new(RATE_LIMIT_PER_SEC).expect("rate limit is nonzero"),
    ));

    let mut role = ConnectionRole::Unclassified;

    while let Some(Ok(msg)) = stream.next().await {
        let WsMessage::Text(text) = msg else {
            if matches!(msg, WsMessage::Close(_)) {
                break;
            }
            continue;
        };

        if limiter.check().is_err() {
            continue; // silent drop per RATE_LIMIT
        }

        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let Some(incoming) = message::classify_incoming(&value) else {
            continue;
        };

        role = handle_frame(&hub, role, incoming, &outbox_tx).await;
    }

    match role {
        ConnectionRole::Browser => hub.clear_browser().await,
        ConnectionRole::Peer(peer_id) => hub.remove_peer(peer_id).await,
        ConnectionRole::Unclassified => {}
    }
    writer.abort();
}

enum ConnectionRole {
    Unclassified,
    Peer(Uuid),
    Browser,
}

async fn handle_frame(
    hub: &Arc<Hub>,
    role: ConnectionRole,
    incoming: IncomingMessage,
    outbox: &mpsc::UnboundedSender<WsMessage>,
) -> ConnectionRole {
    match incoming {
        IncomingMessage::Handshake(handshake) => {
            if handshake.token == hub.token {
                let ack = HandshakeAck::new(handshake.id);
                let frame = serde_json::to_string(&ack).expect("ack serializes");
                let _ = outbox.send(WsMessage::Text(frame.into()));
            } else {
                let nack = HandshakeNack::new(handshake.id, "token mismatch");
                let frame = serde_json::to_string(&nack).expect("nack serializes");
                let _ = outbox.send(WsMessage::Text(frame.into()));
                let _ = outbox.send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                    code: 4001,
                    reason: "token mismatch".into(),
                })));
            }
            role
        }
        IncomingMessage::RegisterPeer(register) => {
            let peer_id = hub.register_peer(register.agent_name, outbox.clone()).await;
            ConnectionRole::Peer(peer_id)
        }
        IncomingMessage::ContextPush(push) => {
            if matches!(role, ConnectionRole::Unclassified) {
                hub.set_browser(outbox.clone()).await;
            }
            if let Ok(context) = serde_json::from_value(push.params.clone()) {
                hub.context.push(context);
            }
            hub.broadcast_context(push.params).await;
            ConnectionRole::Browser
        }
        IncomingMessage::Request(mut request) => {
            if let ConnectionRole::Peer(peer_id) = &role {
                request.peer_id = Some(peer_id.to_string());
            }
            let browser = hub.browser.lock();
            match browser.as_ref() {
                Some(browser) => {
                    let frame = serde_json::to_string(&request).expect("request serializes");
                    let _ = browser.outbox.send(WsMessage::Text(frame.into()));
                }
                None => {
                    let error = serde_json::json!({
                        "code": "BROWSER_DISCONNECTED",
                        "message": "no browser is connected",
                    });
                    let response = Response {
                        id: request.id,
                        result: None,
                        error: Some(error),
                        peer_id: request.peer_id,
                    };
                    let frame = serde_json::to_string(&response).expect("response serializes");
                    let _ = outbox.send(WsMessage::Text(frame.into()));
                }
            }
            role
        }
        IncomingMessage::Response(response) => {
            hub.handle_browser_response(response).await;
            role
        }
        IncomingMessage::HandshakeAck(_) | IncomingMessage::HandshakeNack(_) => role,
    }
}
