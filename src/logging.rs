// src/logging.rs
// Structured logging setup. Every log line goes to stderr; stdout is
// reserved for MCP JSON-RPC frames.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Must be called once, before the
/// bridge or MCP server start producing log lines.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .json()
        .init();
}

/// Fields attached to every tool-call log line per spec §4.I.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallLogFields {
    pub request_id: String,
    pub tool_name: String,
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}
