// src/bridge/peer.rs
// The Peer role: connects to an existing Hub, forwards local tool calls,
// and reconnects with full-jitter backoff on disconnect (spec §4.F).

use super::context::ContextStore;
use super::message::{self, IncomingMessage, Request};
use super::pending::{PendingOutcome, PendingTable};
use crate::resilience::backoff;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use uuid::Uuid;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
/// Cap on reconnect attempts before giving up and surfacing `RETRY_EXHAUSTED`
/// instead of looping against an unreachable hub forever.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Peer {
    pub context: ContextStore,
    pending: Arc<PendingTable>,
    outbox: Mutex<Option<futures_util::stream::SplitSink<WsStream, WsMessage>>>,
    should_reconnect: AtomicBool,
    retry_exhausted: AtomicBool,
}

impl Peer {
    /// Connect to the Hub at `url`, perform the handshake, and register as a
    /// peer under `agent_name`. Returns `None` on handshake timeout/nack so
    /// the caller can fall back to the degraded stdio-only state.
    pub async fn connect(url: &str, token: &str, agent_name: &str) -> Option<Arc<Self>> {
        let (mut stream, _response) = connect_async(url).await.ok()?;

        let handshake_id = Uuid::new_v4().to_string();
        let handshake = message::Handshake::new(handshake_id.clone(), token.to_string());
        let frame = serde_json::to_string(&handshake).expect("handshake serializes");
        stream.send(WsMessage::Text(frame.into())).await.ok()?;

        let ack = tokio::time::timeout(HANDSHAKE_TIMEOUT, wait_for_ack(&mut stream, &handshake_id)).await;
        match ack {
            Ok(true) => {}
            Ok(false) => {
                warn!("hub rejected handshake");
                return None;
            }
            Err(_) => {
                warn!("handshake with hub timed out");
                return None;
            }
        }

        let register = message::RegisterPeer::new(agent_name.to_string());
        let frame = serde_json::to_string(&register).expect("register_peer serializes");
        stream.send(WsMessage::Text(frame.into())).await.ok()?;

        let (sink, stream) = stream.split();
        let peer = Arc::new(Self {
            context: ContextStore::new(),
            pending: Arc::new(PendingTable::new()),
            outbox: Mutex::new(Some(sink)),
            should_reconnect: AtomicBool::new(true),
            retry_exhausted: AtomicBool::new(false),
        });

        tokio::spawn(Self::read_loop(peer.clone(), stream, url.to_string(), token.to_string(), agent_name.to_string()));
        Some(peer)
    }

    pub async fn call_tool(&self, method: &str, params: Value, agent_name: &str) -> Result<oneshot_compat::Receiver, super::BridgeError> {
        if self.retry_exhausted.load(Ordering::SeqCst) {
            return Err(super::BridgeError::RetryExhausted);
        }

        let mut outbox = self.outbox.lock().await;
        let Some(sink) = outbox.as_mut() else {
            return Err(super::BridgeError::ConnectionLost);
        };

        let id = Uuid::new_v4().to_string();
        let rx = self
            .pending
            .register(id.clone())
            .await
            .map_err(|_| super::BridgeError::Overloaded)?;

        let request = Request {
            id: id.clone(),
            method: method.to_string(),
            params,
            agent_name: agent_name.to_string(),
            peer_id: None,
        };
        let frame = serde_json::to_string(&request).expect("request serializes");
        if sink.send(WsMessage::Text(frame.into())).await.is_err() {
            self.pending.cancel(&id).await;
            return Err(super::BridgeError::ConnectionLost);
        }

        Ok(oneshot_compat::Receiver { inner: rx })
    }

    /// Stop reconnect attempts. Pending timers belonging to in-flight
    /// reconnect loops are cancelled on their next check.
    pub fn disconnect(&self) {
        self.should_reconnect.store(false, Ordering::SeqCst);
    }

    async fn read_loop(
        self: Arc<Self>,
        mut stream: futures_util::stream::SplitStream<WsStream>,
        url: String,
        token: String,
        agent_name: String,
    ) {
        while let Some(frame) = stream.next().await {
            let Ok(WsMessage::Text(text)) = frame else {
                break;
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                continue;
            };
            match message::classify_incoming(&value) {
                Some(IncomingMessage::Response(response)) => {
                    let outcome = match response.error {
                        Some(error) => PendingOutcome::Error(error),
                        None => PendingOutcome::Result(response.result.unwrap_or(Value::Null)),
                    };
                    self.pending.resolve(&response.id, outcome).await;
                }
                Some(IncomingMessage::ContextPush(push)) => {
                    if let Ok(context) = serde_json::from_value(push.params) {
                        self.context.push(context);
                    }
                }
                _ => {}
            }
        }
        drop(stream);

        *self.outbox.lock().await = None;
        self.context.clear();
        // Drop every sender so calls left waiting on this connection fail
        // fast with CONNECTION_LOST instead of riding out their full timeout.
        self.pending.clear().await;

        if self.should_reconnect.load(Ordering::SeqCst) {
            self.reconnect_loop(url, token, agent_name).await;
        }
    }

    fn reconnect_loop(
        self: Arc<Self>,
        url: String,
        token: String,
        agent_name: String,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut attempt = 0u32;
            while self.should_reconnect.load(Ordering::SeqCst) {
                if attempt >= MAX_RECONNECT_ATTEMPTS {
                    warn!("giving up on hub reconnect after {attempt} attempts");
                    self.retry_exhausted.store(true, Ordering::SeqCst);
                    return;
                }

                let delay = backoff::delay(attempt);
                tokio::time::sleep(delay).await;

                match connect_async(&url).await {
                    Ok((mut stream, _)) => {
                        let handshake_id = Uuid::new_v4().to_string();
                        let handshake = message::Handshake::new(handshake_id.clone(), token.clone());
                        let frame = serde_json::to_string(&handshake).expect("handshake serializes");
                        if stream.send(WsMessage::Text(frame.into())).await.is_err() {
                            attempt += 1;
                            continue;
                        }

                        let ack = tokio::time::timeout(HANDSHAKE_TIMEOUT, wait_for_ack(&mut stream, &handshake_id)).await;
                        if !matches!(ack, Ok(true)) {
                            attempt += 1;
                            continue;
                        }

                        let register = message::RegisterPeer::new(agent_name.clone());
                        let frame = serde_json::to_string(&register).expect("register_peer serializes");
                        let _ = stream.send(WsMessage::Text(frame.into())).await;

                        info!("peer reconnected to hub after {attempt} attempt(s)");
                        let (sink, new_stream) = stream.split();
                        *self.outbox.lock().await = Some(sink);
                        tokio::spawn(Self::read_loop(self.clone(), new_stream, url, token, agent_name));
                        return;
                    }
                    Err(_) => attempt += 1,
                }
            }
        })
    }
}

async fn wait_for_ack(stream: &mut WsStream, expected_id: &str) -> bool {
    while let Some(Ok(WsMessage::Text(text))) = stream.next().await {
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        match message::classify_incoming(&value) {
            Some(IncomingMessage::HandshakeAck(ack)) if ack.id == expected_id => return true,
            Some(IncomingMessage::HandshakeNack(nack)) if nack.id == expected_id => return false,
            _ => continue,
        }
    }
    false
}

pub mod oneshot_compat {
    use super::PendingOutcome;
    use tokio::sync::oneshot;

    pub struct Receiver {
        pub(super) inner: oneshot::Receiver<PendingOutcome>,
    }

    impl Receiver {
        pub async fn wait(self) -> Result<PendingOutcome, crate::bridge::BridgeError> {
            // A dropped sender means the connection went away mid-call (see
            // `Peer::read_loop`'s `pending.clear()`), not an internal bug.
            self.inner.await.map_err(|_| crate::bridge::BridgeError::ConnectionLost)
        }
    }
}
