// src/mcp/resources.rs
// The two read-only MCP resources (spec §6): `codebase/health` and
// `codebase/context`. Grounded on the teacher's
// `crates/mira-server/src/mcp/resources.rs` JSON-resource readers, adapted
// to a fixed two-resource catalogue instead of a database-backed list.

use crate::bridge::context::CodebaseContext;
use crate::bridge::Bridge;
use chrono::Utc;
use serde_json::json;
use std::fmt::Write as _;

pub const HEALTH_URI: &str = "gitnexus://codebase/health";
pub const CONTEXT_URI: &str = "gitnexus://codebase/context";

pub fn health_json(bridge: &Bridge) -> serde_json::Value {
    let connected = bridge.is_browser_connected();
    let context = bridge.current_context();

    let status = match (connected, &context) {
        (false, _) => "disconnected",
        (true, None) => "no_context",
        (true, Some(_)) => "healthy",
    };

    let mut body = json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "connection": {
            "browser": connected,
            "mode": bridge.mode(),
        },
    });

    if let Some(ctx) = context {
        body["context"] = json!({
            "project": ctx.project_name,
            "files": ctx.stats.file_count,
            "functions": ctx.stats.function_count,
        });
    }

    body
}

/// Deterministic markdown rendering of the context snapshot (spec §6).
pub fn context_markdown(context: Option<&CodebaseContext>) -> String {
    let Some(context) = context else {
        return "No codebase context is available yet. Open the GitNexus browser app and let it finish indexing.".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "# {}", context.project_name);
    out.push('\n');

    out.push_str("## Statistics\n");
    let _ = writeln!(out, "- Files: {}", context.stats.file_count);
    let _ = writeln!(out, "- Functions: {}", context.stats.function_count);
    let _ = writeln!(out, "- Classes: {}", context.stats.class_count);
    let _ = writeln!(out, "- Interfaces: {}", context.stats.interface_count);
    let _ = writeln!(out, "- Methods: {}", context.stats.method_count);
    out.push('\n');

    out.push_str("## Hotspots\n");
    if context.hotspots.is_empty() {
        out.push_str("_No hotspots reported._\n");
    } else {
        for hotspot in &context.hotspots {
            let _ = writeln!(
                out,
                "- {} ({}) — {} connections — {}",
                hotspot.name, hotspot.kind, hotspot.connections, hotspot.file_path
            );
        }
    }
    out.push('\n');

    out.push_str("## Project Structure\n");
    out.push_str("```\n");
    out.push_str(&context.folder_tree);
    out.push_str("\n```\n\n");

    out.push_str("## Tools and Graph Schema\n");
    out.push_str(
        "15 read-only tools are available: context, search, cypher, grep, read, explore, \
        overview, impact, highlight, diff, deep_dive, review_file, trace_flow, find_similar, \
        test_impact. Call `tools/list` for their full input schemas.\n",
    );

    out
}
