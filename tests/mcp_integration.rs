// tests/mcp_integration.rs
// End-to-end MCP tests: spawn the compiled binary and speak JSON-RPC over
// its stdio, matching spec §8's boundary scenarios. Grounded on the
// teacher's `backend/tests/mcp_integration.rs` `McpTestClient` pattern,
// simplified since this daemon has no database to migrate.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

struct McpTestClient {
    process: Child,
    reader: BufReader<std::process::ChildStdout>,
    request_id: i64,
}

impl McpTestClient {
    fn new() -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_gitnexus-mcp"))
            .arg("serve")
            .arg("--port")
            .arg("0") // ephemeral port: becomes Hub, but no browser ever connects
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start gitnexus-mcp");

        let stdout = process.stdout.take().expect("failed to get stdout");
        let reader = BufReader::new(stdout);

        let mut client = Self {
            process,
            reader,
            request_id: 0,
        };
        client.initialize();
        client
    }

    fn send_request(&mut self, method: &str, params: Value) -> Value {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params,
        });

        let stdin = self.process.stdin.as_mut().expect("failed to get stdin");
        writeln!(stdin, "{request}").expect("failed to write request");
        stdin.flush().expect("failed to flush");

        let mut response_line = String::new();
        self.reader
            .read_line(&mut response_line)
            .expect("failed to read response");
        serde_json::from_str(&response_line).expect("failed to parse response")
    }

    fn send_notification(&mut self, method: &str, params: Value) {
        let notification = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        let stdin = self.process.stdin.as_mut().expect("failed to get stdin");
        writeln!(stdin, "{notification}").expect("failed to write notification");
        stdin.flush().expect("failed to flush");
    }

    fn initialize(&mut self) {
        let response = self.send_request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "gitnexus-mcp-integration-test", "version": "1.0.0" },
            }),
        );
        assert!(response.get("result").is_some(), "initialize failed: {response:?}");
        self.send_notification("notifications/initialized", json!({}));
    }

    fn list_tools(&mut self) -> Vec<String> {
        let response = self.send_request("tools/list", json!({}));
        response
            .get("result")
            .and_then(|r| r.get("tools"))
            .and_then(|t| t.as_array())
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn call_tool(&mut self, name: &str, arguments: Value) -> ToolResult {
        let response = self.send_request("tools/call", json!({ "name": name, "arguments": arguments }));

        if let Some(error) = response.get("error") {
            return ToolResult {
                success: false,
                content: error.to_string(),
            };
        }

        let result = response.get("result").expect("no result in response");
        let content = result
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|item| item.get("text"))
            .and_then(|t| t.as_str())
            .unwrap_or("");
        let is_error = result.get("isError").and_then(|e| e.as_bool()).unwrap_or(false);

        ToolResult {
            success: !is_error,
            content: content.to_string(),
        }
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

struct ToolResult {
    success: bool,
    content: String,
}

impl ToolResult {
    fn parse_json(&self) -> Option<Value> {
        serde_json::from_str(&self.content).ok()
    }
}

#[test]
fn lists_exactly_the_fifteen_documented_tools() {
    let mut client = McpTestClient::new();
    let tools = client.list_tools();

    let expected = [
        "context", "search", "cypher", "grep", "read", "explore", "overview", "impact",
        "highlight", "diff", "deep_dive", "review_file", "trace_flow", "find_similar",
        "test_impact",
    ];
    for name in expected {
        assert!(tools.contains(&name.to_string()), "missing tool: {name}. got: {tools:?}");
    }
    assert_eq!(tools.len(), 15, "expected exactly 15 tools, got {}: {tools:?}", tools.len());
}

#[test]
fn tools_list_is_idempotent() {
    let mut client = McpTestClient::new();
    let first = client.list_tools();
    let second = client.list_tools();
    assert_eq!(first, second);
}

#[test]
fn calling_an_unknown_tool_returns_tool_not_found() {
    let mut client = McpTestClient::new();
    let result = client.call_tool("does_not_exist", json!({}));
    assert!(!result.success);
    let body = result.parse_json().expect("error body should be JSON");
    assert_eq!(body["code"], json!("TOOL_NOT_FOUND"));
}

#[test]
fn missing_required_field_fails_validation_before_reaching_the_bridge() {
    let mut client = McpTestClient::new();
    // `search` requires `query`.
    let result = client.call_tool("search", json!({}));
    assert!(!result.success);
    let body = result.parse_json().expect("error body should be JSON");
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[test]
fn unknown_field_is_rejected_with_additional_properties_false() {
    let mut client = McpTestClient::new();
    let result = client.call_tool("search", json!({ "query": "foo", "bogus_field": 1 }));
    assert!(!result.success);
    let body = result.parse_json().expect("error body should be JSON");
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[test]
fn cypher_write_keyword_is_rejected_by_the_firewall_before_any_bridge_call() {
    let mut client = McpTestClient::new();
    let result = client.call_tool("cypher", json!({ "query": "MATCH (n) DETACH DELETE n" }));
    assert!(!result.success);
    let body = result.parse_json().expect("error body should be JSON");
    assert_eq!(body["code"], json!("CYPHER_FORBIDDEN"));
}

#[test]
fn well_formed_call_with_no_browser_connected_fails_with_browser_disconnected() {
    let mut client = McpTestClient::new();
    let result = client.call_tool("search", json!({ "query": "parseFile" }));
    assert!(!result.success);
    let body = result.parse_json().expect("error body should be JSON");
    assert_eq!(body["code"], json!("BROWSER_DISCONNECTED"));
    assert_eq!(body["retryable"], json!(true));
}

#[test]
fn health_resource_reports_disconnected_with_no_browser() {
    let mut client = McpTestClient::new();
    let response = client.send_request(
        "resources/read",
        json!({ "uri": "gitnexus://codebase/health" }),
    );
    let result = response.get("result").expect("health resource should read cleanly");
    let text = result["contents"][0]["text"].as_str().expect("health resource is text");
    let body: Value = serde_json::from_str(text).expect("health body is JSON");
    assert_eq!(body["status"], json!("disconnected"));
}
