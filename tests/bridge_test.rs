// tests/bridge_test.rs
// Exercises the Hub/browser round trip end-to-end over a real localhost
// TCP port: a fake "browser" connects over WebSocket, registers by pushing
// context, then answers a forwarded tool-call request, and we assert the
// Bridge's `call_tool` future resolves with that answer.

use futures_util::{SinkExt, StreamExt};
use gitnexus_mcp::bridge::Bridge;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

async fn free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn hub_forwards_a_tool_call_to_the_browser_and_resolves_with_its_answer() {
    let port = free_port().await;
    let bridge = Bridge::bootstrap(port, Some("test-token".to_string()), "test-agent").await;
    assert_eq!(bridge.mode(), "hub");
    assert!(!bridge.is_browser_connected());

    let url = format!("ws://127.0.0.1:{port}/");
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.expect("browser ws connect");
    let (mut write, mut read) = ws.split();

    // Register as the browser by pushing a context snapshot.
    let push = json!({
        "type": "context_push",
        "params": {
            "project_name": "gitnexus",
            "stats": { "file_count": 1, "function_count": 1, "class_count": 0, "interface_count": 0, "method_count": 0 },
            "hotspots": [],
            "folder_tree": "src/",
        }
    });
    write.send(Message::Text(push.to_string().into())).await.unwrap();

    // Give the Hub a moment to process the registration.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(bridge.is_browser_connected());

    let call = tokio::spawn(async move { bridge.call_tool("search", json!({"query": "foo"}), "test-agent").await });

    // Read the forwarded request and answer it as the browser would.
    let frame = read.next().await.expect("expected a forwarded request").unwrap();
    let Message::Text(text) = frame else { panic!("expected a text frame") };
    let request: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(request["method"], json!("search"));

    let response = json!({
        "id": request["id"],
        "result": { "matches": [] },
    });
    write.send(Message::Text(response.to_string().into())).await.unwrap();

    let outcome = call.await.unwrap().expect("call_tool should resolve");
    match outcome {
        gitnexus_mcp::bridge::pending::PendingOutcome::Result(value) => {
            assert_eq!(value, json!({ "matches": [] }));
        }
        gitnexus_mcp::bridge::pending::PendingOutcome::Error(_) => panic!("expected a result, got an error"),
    }
}

#[tokio::test]
async fn hub_rejects_a_handshake_with_the_wrong_token() {
    let port = free_port().await;
    let _bridge = Bridge::bootstrap(port, Some("correct-token".to_string()), "test-agent").await;

    let url = format!("ws://127.0.0.1:{port}/");
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.expect("peer ws connect");
    let (mut write, mut read) = ws.split();

    let handshake = json!({ "type": "handshake", "id": "h1", "token": "wrong-token" });
    write.send(Message::Text(handshake.to_string().into())).await.unwrap();

    let frame = read.next().await.expect("expected a nack").unwrap();
    let Message::Text(text) = frame else { panic!("expected a text frame") };
    let nack: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(nack["type"], json!("handshake_nack"));
}
