// src/mcp/error.rs
// Typed tool-result error envelope (spec §3, §4.G, §7).

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    CypherForbidden,
    Timeout,
    CircuitOpen,
    BrowserDisconnected,
    ConnectionLost,
    ToolNotFound,
    InternalError,
    RetryExhausted,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::CypherForbidden => "cypher_forbidden",
            ErrorCode::Timeout => "timeout",
            ErrorCode::CircuitOpen => "circuit_open",
            ErrorCode::BrowserDisconnected => "browser_disconnected",
            ErrorCode::ConnectionLost => "connection_lost",
            ErrorCode::ToolNotFound => "tool_not_found",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::RetryExhausted => "retry_exhausted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
    pub suggestion: String,
    pub retryable: bool,
    pub retry_after: Option<u64>,
}

impl ToolError {
    pub fn validation_error(issues: &[crate::validation::ValidationIssue]) -> Self {
        let message = issues
            .iter()
            .map(|i| i.message.clone())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            code: ErrorCode::ValidationError,
            message,
            details: Some(json!({ "issues": issues.iter().map(|i| json!({"path": i.path, "message": i.message})).collect::<Vec<_>>() })),
            suggestion: "Check the tool's input schema and correct the listed fields.".to_string(),
            retryable: false,
            retry_after: None,
        }
    }

    pub fn cypher_forbidden(err: &crate::validation::firewall::FirewallError) -> Self {
        Self {
            code: ErrorCode::CypherForbidden,
            message: err.reason.clone(),
            details: err.keyword.as_ref().map(|k| json!({ "keyword": k })),
            suggestion: "Only read-only clauses are allowed (MATCH, RETURN, WITH, OPTIONAL, UNWIND).".to_string(),
            retryable: false,
            retry_after: None,
        }
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self {
            code: ErrorCode::ToolNotFound,
            message: format!("unknown tool '{name}'"),
            details: None,
            suggestion: "Call tools/list to see the available tools.".to_string(),
            retryable: false,
            retry_after: None,
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            code: ErrorCode::Timeout,
            message: format!("the call did not complete within {timeout_ms}ms"),
            details: None,
            suggestion: "Retry the call; consider narrowing its scope if it keeps timing out.".to_string(),
            retryable: true,
            retry_after: None,
        }
    }

    pub fn circuit_open(retry_after_secs: u64) -> Self {
        Self {
            code: ErrorCode::CircuitOpen,
            message: "the backend has failed repeatedly and calls are temporarily suspended".to_string(),
            details: None,
            suggestion: format!("Wait {retry_after_secs} seconds before retrying."),
            retryable: true,
            retry_after: Some(retry_after_secs),
        }
    }

    pub fn browser_disconnected() -> Self {
        Self {
            code: ErrorCode::BrowserDisconnected,
            message: "no browser is connected to the code-intelligence engine".to_string(),
            details: None,
            suggestion: "Open the GitNexus browser app and wait for it to connect.".to_string(),
            retryable: true,
            retry_after: None,
        }
    }

    pub fn connection_lost() -> Self {
        Self {
            code: ErrorCode::ConnectionLost,
            message: "lost connection to the hub".to_string(),
            details: None,
            suggestion: "The peer is attempting to reconnect; retry shortly.".to_string(),
            retryable: true,
            retry_after: None,
        }
    }

    pub fn retry_exhausted() -> Self {
        Self {
            code: ErrorCode::RetryExhausted,
            message: "gave up reconnecting to the hub after repeated attempts".to_string(),
            details: None,
            suggestion: "Restart this daemon instance once the hub is reachable again.".to_string(),
            retryable: false,
            retry_after: None,
        }
    }

    pub fn internal_error(message: impl Into<String>, debug: bool) -> Self {
        let message = message.into();
        Self {
            code: ErrorCode::InternalError,
            details: if debug {
                Some(json!({ "debug_message": message }))
            } else {
                None
            },
            message: "an internal error occurred".to_string(),
            suggestion: "Retry the call; report this if it persists.".to_string(),
            retryable: true,
            retry_after: None,
        }
    }

    /// The JSON text content the MCP layer wraps with `is_error = true`.
    pub fn to_json(&self) -> Value {
        let mut obj = json!({
            "error": true,
            "code": self.code,
            "message": self.message,
            "suggestion": self.suggestion,
            "retryable": self.retryable,
        });
        if let Some(details) = &self.details {
            obj["details"] = details.clone();
        }
        if let Some(retry_after) = self.retry_after {
            obj["retry_after"] = json!(retry_after);
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_value(ErrorCode::ValidationError).unwrap(), json!("VALIDATION_ERROR"));
        assert_eq!(serde_json::to_value(ErrorCode::CircuitOpen).unwrap(), json!("CIRCUIT_OPEN"));
    }

    #[test]
    fn internal_error_hides_details_unless_debug() {
        let err = ToolError::internal_error("boom", false);
        assert!(err.details.is_none());
        let err = ToolError::internal_error("boom", true);
        assert!(err.details.is_some());
    }

    #[test]
    fn envelope_always_carries_error_true() {
        let err = ToolError::tool_not_found("bogus");
        let json = err.to_json();
        assert_eq!(json["error"], json!(true));
        assert_eq!(json["code"], json!("TOOL_NOT_FOUND"));
    }

    #[test]
    fn connection_lost_is_retryable_but_retry_exhausted_is_not() {
        assert!(ToolError::connection_lost().retryable);
        assert!(!ToolError::retry_exhausted().retryable);
        assert_eq!(ErrorCode::ConnectionLost.as_str(), "connection_lost");
        assert_eq!(ErrorCode::RetryExhausted.as_str(), "retry_exhausted");
    }
}
