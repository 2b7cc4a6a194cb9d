// src/config/mod.rs
// Central configuration for the gateway daemon, loaded from the environment.

pub mod helpers;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref CONFIG: GatewayConfig = GatewayConfig::from_env();
}

/// Default localhost port the bridge Hub binds to.
pub const DEFAULT_PORT: u16 = 54319;

/// Process-wide configuration, assembled once at startup from the
/// environment documented in spec §6.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub agent_name: String,
    pub quick_timeout_ms: u64,
    pub heavy_timeout_ms: u64,
    pub debug: bool,
    pub log_level: String,
    /// Preshared bridge token; `None` means the Hub must mint one at startup.
    pub token: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            agent_name: detect_agent_name(),
            quick_timeout_ms: helpers::env_u64("GITNEXUS_TIMEOUT_QUICK", 60_000),
            heavy_timeout_ms: helpers::env_u64("GITNEXUS_TIMEOUT_HEAVY", 120_000),
            debug: helpers::env_bool("GITNEXUS_DEBUG", false),
            log_level: helpers::env_or("LOG_LEVEL", "info"),
            token: std::env::var("GITNEXUS_TOKEN").ok(),
        }
    }
}

/// Resolve the agent name for logging/forwarding: explicit env var first,
/// then a well-known indicator of the parent process, else "unknown".
fn detect_agent_name() -> String {
    if let Ok(name) = std::env::var("GITNEXUS_AGENT") {
        if !name.trim().is_empty() {
            return name;
        }
    }

    for (key, value) in std::env::vars() {
        if key == "CLAUDECODE" || key == "CLAUDE_CODE_ENTRYPOINT" {
            return "claude-code".to_string();
        }
        if key == "CURSOR_TRACE_ID" {
            return "cursor".to_string();
        }
        if key == "TERM_PROGRAM" && value.eq_ignore_ascii_case("vscode") {
            return "vscode".to_string();
        }
    }

    "unknown".to_string()
}
