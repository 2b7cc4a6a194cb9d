// src/bridge/message.rs
// Bridge wire messages (spec §3, §6). Serde's `#[serde(untagged)]` is too
// ambiguous to disambiguate these reliably (a `request` and a `response`
// both serialize to plain objects with overlapping optional fields), so
// each kind gets its own typed struct and incoming traffic is classified by
// inspecting which keys are present, mirroring the Hub's own classification
// rule in spec §4.F.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub token: String,
}

impl Handshake {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            kind: "handshake".to_string(),
            id: id.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAck {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl HandshakeAck {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: "handshake_ack".to_string(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeNack {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub error: String,
}

impl HandshakeNack {
    pub fn new(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            kind: "handshake_nack".to_string(),
            id: id.into(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPeer {
    #[serde(rename = "type")]
    pub kind: String,
    pub agent_name: String,
}

impl RegisterPeer {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            kind: "register_peer".to_string(),
            agent_name: agent_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPush {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    pub params: Value,
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
}

/// The classified shape of an inbound frame, independent of which
/// connection it arrived on.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Handshake(Handshake),
    HandshakeAck(HandshakeAck),
    HandshakeNack(HandshakeNack),
    RegisterPeer(RegisterPeer),
    ContextPush(ContextPush),
    Request(Request),
    Response(Response),
}

/// Classify a raw JSON frame per spec §4.F: dispatch on `type` when
/// present, otherwise on the presence of `method` vs `result`/`error`.
pub fn classify_incoming(value: &Value) -> Option<IncomingMessage> {
    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        return match kind {
            "handshake" => serde_json::from_value(value.clone()).ok().map(IncomingMessage::Handshake),
            "handshake_ack" => serde_json::from_value(value.clone()).ok().map(IncomingMessage::HandshakeAck),
            "handshake_nack" => serde_json::from_value(value.clone()).ok().map(IncomingMessage::HandshakeNack),
            "register_peer" => serde_json::from_value(value.clone()).ok().map(IncomingMessage::RegisterPeer),
            "context_push" => serde_json::from_value(value.clone()).ok().map(IncomingMessage::ContextPush),
            _ => None,
        };
    }

    if value.get("method").is_some() {
        return serde_json::from_value(value.clone()).ok().map(IncomingMessage::Request);
    }

    if value.get("id").is_some() && (value.get("result").is_some() || value.get("error").is_some()) {
        return serde_json::from_value(value.clone()).ok().map(IncomingMessage::Response);
    }

    None
}
