// src/validation/firewall.rs
// Read-only enforcement for the `cypher` tool (spec §4.D).

use lazy_static::lazy_static;
use regex::Regex;

const MAX_QUERY_LEN: usize = 10_000;
const MIN_QUERY_LEN: usize = 6;

const ALLOW_SET: &[&str] = &["MATCH", "RETURN", "WITH", "OPTIONAL", "UNWIND"];

const DENY_SET: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "DROP", "SET", "REMOVE", "CALL", "LOAD", "CSV",
    "FOREACH", "USING", "INDEX", "CONSTRAINT", "DATABASE", "USER", "ROLE", "GRANT", "REVOKE",
    "DENY", "SHOW", "START", "STOP", "ALTER", "RENAME",
];

lazy_static! {
    static ref DENY_PATTERNS: Vec<(&'static str, Regex)> = DENY_SET
        .iter()
        .map(|kw| {
            let pattern = format!(r"(?i)\b{kw}\b");
            (*kw, Regex::new(&pattern).expect("deny-set pattern is valid"))
        })
        .collect();
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FirewallError {
    pub keyword: Option<String>,
    pub reason: String,
}

impl FirewallError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            keyword: None,
            reason: reason.into(),
        }
    }

    fn keyword(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            reason: reason.into(),
        }
    }
}

/// Check `query` against the read-only firewall rules, in order. Returns the
/// trimmed query on success.
pub fn check(query: &str) -> Result<String, FirewallError> {
    let trimmed = query.trim();

    if trimmed.len() < MIN_QUERY_LEN {
        return Err(FirewallError::new(format!(
            "query must be at least {MIN_QUERY_LEN} characters"
        )));
    }
    if trimmed.len() > MAX_QUERY_LEN {
        return Err(FirewallError::new(format!(
            "query exceeds the {MAX_QUERY_LEN} character limit"
        )));
    }

    let first_token = trimmed
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    if !ALLOW_SET.contains(&first_token.as_str()) {
        return Err(FirewallError::keyword(
            first_token,
            "query must start with a read-only clause (MATCH, RETURN, WITH, OPTIONAL, UNWIND)",
        ));
    }

    for (keyword, pattern) in DENY_PATTERNS.iter() {
        if pattern.is_match(trimmed) {
            return Err(FirewallError::keyword(
                *keyword,
                "only read-only clauses are allowed",
            ));
        }
    }

    if has_semicolon_outside_quotes(trimmed) {
        return Err(FirewallError::new(
            "multiple statements are not allowed",
        ));
    }

    Ok(trimmed.to_string())
}

fn has_semicolon_outside_quotes(query: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    for ch in query.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_simple_match_return() {
        let result = check("MATCH (n:File) RETURN n.name LIMIT 10");
        assert_eq!(result.unwrap(), "MATCH (n:File) RETURN n.name LIMIT 10");
    }

    #[test]
    fn rejects_detach_delete() {
        let err = check("MATCH (n) DETACH DELETE n RETURN 1").unwrap_err();
        assert!(matches!(err.keyword.as_deref(), Some("DETACH") | Some("DELETE")));
    }

    #[test]
    fn rejects_non_allow_listed_first_token() {
        let err = check("CREATE (n:File) RETURN n").unwrap_err();
        assert_eq!(err.keyword.as_deref(), Some("CREATE"));
    }

    #[test]
    fn rejects_semicolon_outside_quotes() {
        assert!(check("MATCH (n) RETURN n; MATCH (m) RETURN m").is_err());
    }

    #[test]
    fn permits_semicolon_inside_quotes() {
        let result = check("MATCH (n) WHERE n.name = 'a;b' RETURN n");
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_too_short_query() {
        assert!(check("MA").is_err());
    }

    #[test]
    fn rejects_too_long_query() {
        let query = format!("MATCH {} RETURN 1", "x".repeat(MAX_QUERY_LEN));
        assert!(check(&query).is_err());
    }

    #[test]
    fn deny_match_is_word_boundary_not_substring() {
        // "Setup" contains "set" but must not trip the SET deny rule.
        let result = check("MATCH (n:Setup) RETURN n");
        assert!(result.is_ok());
    }

    #[test]
    fn normalizes_by_trimming_whitespace() {
        let result = check("  MATCH (n) RETURN n  ").unwrap();
        assert_eq!(result, "MATCH (n) RETURN n");
    }
}
