// src/mcp/server.rs
// The GatewayServer: manual `ServerHandler` implementation dispatching over
// the dynamic tool registry (spec §4.G). A dynamic, registry-driven
// catalogue doesn't fit the teacher's compile-time `#[tool_router]` macros
// (each exposes a fixed set of typed methods), so this follows the manual
// `list_tools`/`call_tool` pattern shown by the pack's other MCP gateways
// (e.g. agentic-warden's dynamic tool dispatch) while keeping the resource
// handlers and `get_info` style from the teacher's `mcp/resources.rs` and
// `main.rs`.

use super::error::ToolError;
use super::resources;
use crate::bridge::pending::PendingOutcome;
use crate::bridge::{Bridge, BridgeError};
use crate::logging::CallLogFields;
use crate::registry;
use crate::resilience::circuit_breaker::Admission;
use crate::resilience::{timeout, BREAKER};
use crate::validation::{self, firewall};
use crate::CONFIG;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListResourcesResult,
    ListToolsResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
    Resource, ResourceContents, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData as McpError;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct GatewayServer {
    bridge: Arc<Bridge>,
}

impl GatewayServer {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    fn tool_to_mcp(descriptor: &registry::ToolDescriptor) -> Tool {
        Tool::new(
            descriptor.name,
            descriptor.description,
            Arc::new(descriptor.input_schema()),
        )
    }

    async fn run_call_tool(&self, request_id: &str, name: &str, raw_args: Map<String, Value>) -> Result<Value, ToolError> {
        let started = std::time::Instant::now();
        let result = self.run_call_tool_inner(name, raw_args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.code.as_str(),
        };
        metrics::counter!("tool_calls_total", "tool" => name.to_string(), "outcome" => outcome.to_string())
            .increment(1);
        metrics::histogram!("tool_call_duration_ms", "tool" => name.to_string())
            .record(duration_ms as f64);

        info!(
            call = ?CallLogFields {
                request_id: request_id.to_string(),
                tool_name: name.to_string(),
                agent_name: CONFIG.agent_name.clone(),
                duration_ms: Some(duration_ms),
                outcome: Some(outcome.to_string()),
            },
            "tool call completed"
        );

        result
    }

    async fn run_call_tool_inner(&self, name: &str, raw_args: Map<String, Value>) -> Result<Value, ToolError> {
        let Some(descriptor) = registry::find(name) else {
            return Err(ToolError::tool_not_found(name));
        };

        let mut args = validation::validate(descriptor, &raw_args).map_err(|e| ToolError::validation_error(&e.issues))?;

        if name == "cypher" {
            let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
            let trimmed = firewall::check(query).map_err(|e| ToolError::cypher_forbidden(&e))?;
            args.insert("query".to_string(), Value::String(trimmed));
        }

        match BREAKER.admit() {
            Admission::Admitted => {}
            Admission::Rejected { retry_after_secs } => {
                return Err(ToolError::circuit_open(retry_after_secs));
            }
        }

        let deadline_ms = descriptor.timeout_ms(CONFIG.quick_timeout_ms, CONFIG.heavy_timeout_ms);
        let method = name.to_string();
        let params = Value::Object(args);
        let bridge = self.bridge.clone();
        let agent_name = CONFIG.agent_name.clone();

        let outcome = timeout::with_timeout(
            Duration::from_millis(deadline_ms),
            async move { bridge.call_tool(&method, params, &agent_name).await.map_err(Into::into) },
            name,
        )
        .await;

        match outcome {
            Ok(PendingOutcome::Result(value)) => {
                BREAKER.record_success();
                Ok(value)
            }
            Ok(PendingOutcome::Error(error)) => {
                // An application-level error reported by the browser itself,
                // not a backend-reachability failure, so it is not counted
                // against the breaker (spec §7: INTERNAL_ERROR, breaker=no).
                Err(ToolError::internal_error(error.to_string(), CONFIG.debug))
            }
            Err(e) if e.downcast_ref::<BridgeError>().is_some() => {
                let bridge_err = e.downcast::<BridgeError>().expect("just checked");
                match bridge_err {
                    BridgeError::BrowserDisconnected => Err(ToolError::browser_disconnected()),
                    BridgeError::ConnectionLost => Err(ToolError::connection_lost()),
                    BridgeError::RetryExhausted => Err(ToolError::retry_exhausted()),
                    BridgeError::Overloaded => Err(ToolError::internal_error("too many in-flight requests", true)),
                    BridgeError::Internal => Err(ToolError::internal_error("internal bridge error", CONFIG.debug)),
                }
            }
            Err(_timeout) => {
                BREAKER.record_failure();
                Err(ToolError::timeout(deadline_ms))
            }
        }
    }
}

impl rmcp::ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            server_info: Implementation {
                name: "gitnexus-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Read-only code-intelligence gateway for the GitNexus browser engine. \
                Tool calls are forwarded to a connected browser session; if none is connected \
                calls fail with BROWSER_DISCONNECTED."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: registry::all().iter().map(Self::tool_to_mcp).collect(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("tool_call", request_id = %request_id, tool_name = %request.name, agent_name = %CONFIG.agent_name);

        let args = request.arguments.unwrap_or_default();
        let result = self
            .run_call_tool(&request_id, &request.name, args)
            .instrument(span)
            .await;

        Ok(match result {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(err) => {
                let text = serde_json::to_string_pretty(&err.to_json()).unwrap_or_default();
                CallToolResult::error(vec![Content::text(text)])
            }
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut resources = vec![Resource::new(
            rmcp::model::RawResource {
                description: Some("Bridge connection and context liveness.".to_string()),
                mime_type: Some("application/json".to_string()),
                ..rmcp::model::RawResource::new(resources::HEALTH_URI, "health")
            },
            None,
        )];

        if self.bridge.current_context().is_some() {
            resources.push(Resource::new(
                rmcp::model::RawResource {
                    description: Some("Latest codebase context snapshot pushed by the browser.".to_string()),
                    mime_type: Some("text/markdown".to_string()),
                    ..rmcp::model::RawResource::new(resources::CONTEXT_URI, "context")
                },
                None,
            ));
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match request.uri.as_str() {
            resources::HEALTH_URI => {
                let json = resources::health_json(&self.bridge);
                let text = serde_json::to_string_pretty(&json).unwrap_or_default();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(text, resources::HEALTH_URI)],
                })
            }
            resources::CONTEXT_URI => {
                let context = self.bridge.current_context();
                let markdown = resources::context_markdown(context.as_ref());
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(markdown, resources::CONTEXT_URI)],
                })
            }
            other => Err(McpError::invalid_params(format!("unknown resource URI: {other}"), None)),
        }
    }
}
