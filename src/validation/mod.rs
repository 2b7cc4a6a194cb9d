// src/validation/mod.rs
// Schema validator: turns a raw JSON argument map into a normalized one, or
// a structured VALIDATION_ERROR.

pub mod firewall;

use crate::registry::{FieldSchema, FieldType, ToolDescriptor};
use serde_json::{Map, Value};

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }
}

/// Validate and normalize `raw` against `tool`'s schema. Unknown fields are
/// rejected; missing fields with a default are filled in; per-tool
/// cross-field refinements run last.
pub fn validate(
    tool: &ToolDescriptor,
    raw: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    let known: Vec<&str> = tool.fields.iter().map(|(name, _)| *name).collect();
    for key in raw.keys() {
        if !known.contains(&key.as_str()) {
            return Err(ValidationError::single(
                key.clone(),
                format!("unknown field '{key}' for tool '{}'", tool.name),
            ));
        }
    }

    let mut out = Map::new();
    let mut issues = Vec::new();

    for (name, schema) in &tool.fields {
        match raw.get(*name) {
            Some(value) => match validate_field(name, schema, value) {
                Ok(normalized) => {
                    out.insert((*name).to_string(), normalized);
                }
                Err(mut field_issues) => issues.append(&mut field_issues),
            },
            None => {
                if schema.required {
                    issues.push(ValidationIssue {
                        path: (*name).to_string(),
                        message: format!("'{name}' is required"),
                    });
                } else if let Some(default) = &schema.default {
                    out.insert((*name).to_string(), default.clone());
                }
            }
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }

    if let Err(e) = apply_refinements(tool.name, &out) {
        return Err(e);
    }

    Ok(out)
}

fn validate_field(
    name: &str,
    schema: &FieldSchema,
    value: &Value,
) -> Result<Value, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    match schema.field_type {
        FieldType::String => {
            let Some(s) = value.as_str() else {
                return Err(vec![type_issue(name, "string")]);
            };
            if let Some(min) = schema.min_length {
                if s.len() < min {
                    issues.push(ValidationIssue {
                        path: name.to_string(),
                        message: format!("'{name}' cannot be empty"),
                    });
                }
            }
            if let Some(values) = schema.enum_values {
                if !values.contains(&s) {
                    issues.push(ValidationIssue {
                        path: name.to_string(),
                        message: format!(
                            "'{name}' must be one of {values:?}, got '{s}'"
                        ),
                    });
                }
            }
        }
        FieldType::Integer => {
            let Some(n) = value.as_i64() else {
                return Err(vec![type_issue(name, "integer")]);
            };
            range_check(name, n as f64, schema, &mut issues);
        }
        FieldType::Float => {
            let Some(n) = value.as_f64() else {
                return Err(vec![type_issue(name, "number")]);
            };
            range_check(name, n, schema, &mut issues);
        }
        FieldType::Boolean => {
            if value.as_bool().is_none() {
                return Err(vec![type_issue(name, "boolean")]);
            }
        }
        FieldType::StringArray => {
            let Some(arr) = value.as_array() else {
                return Err(vec![type_issue(name, "array")]);
            };
            if !arr.iter().all(|v| v.is_string()) {
                issues.push(ValidationIssue {
                    path: name.to_string(),
                    message: format!("'{name}' must be an array of strings"),
                });
            }
            if let Some(min_items) = schema.min_items {
                if arr.len() < min_items {
                    issues.push(ValidationIssue {
                        path: name.to_string(),
                        message: format!("'{name}' must have at least {min_items} element(s)"),
                    });
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(value.clone())
    } else {
        Err(issues)
    }
}

fn range_check(name: &str, n: f64, schema: &FieldSchema, issues: &mut Vec<ValidationIssue>) {
    if let Some(min) = schema.min {
        if n < min {
            issues.push(ValidationIssue {
                path: name.to_string(),
                message: format!("'{name}' must be >= {min}"),
            });
        }
    }
    if let Some(max) = schema.max {
        if n > max {
            issues.push(ValidationIssue {
                path: name.to_string(),
                message: format!("'{name}' must be <= {max}"),
            });
        }
    }
}

fn type_issue(name: &str, expected: &str) -> ValidationIssue {
    ValidationIssue {
        path: name.to_string(),
        message: format!("'{name}' must be a {expected}"),
    }
}

/// Cross-field refinements that don't fit the generic per-field schema.
fn apply_refinements(tool_name: &str, normalized: &Map<String, Value>) -> Result<(), ValidationError> {
    if tool_name == "read" {
        let start = normalized.get("start_line").and_then(Value::as_i64);
        let end = normalized.get("end_line").and_then(Value::as_i64);
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(ValidationError::single(
                    "end_line",
                    "'end_line' must be >= 'start_line'",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_required_string_fails_with_cannot_be_empty() {
        let tool = registry::find("search").unwrap();
        let raw = args(&[("query", json!("")), ("limit", json!(5))]);
        let err = validate(tool, &raw).unwrap_err();
        assert!(err.issues.iter().any(|i| i.path == "query" && i.message.contains("cannot be empty")));
    }

    #[test]
    fn defaults_are_filled() {
        let tool = registry::find("search").unwrap();
        let raw = args(&[("query", json!("hello"))]);
        let normalized = validate(tool, &raw).unwrap();
        assert_eq!(normalized.get("limit"), Some(&json!(10)));
        assert_eq!(normalized.get("group_by_process"), Some(&json!(true)));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let tool = registry::find("search").unwrap();
        let raw = args(&[("query", json!("hello")), ("bogus", json!(1))]);
        assert!(validate(tool, &raw).is_err());
    }

    #[test]
    fn read_end_before_start_is_rejected() {
        let tool = registry::find("read").unwrap();
        let raw = args(&[
            ("file_path", json!("src/lib.rs")),
            ("start_line", json!(10)),
            ("end_line", json!(5)),
        ]);
        assert!(validate(tool, &raw).is_err());
    }

    #[test]
    fn read_end_after_start_is_accepted() {
        let tool = registry::find("read").unwrap();
        let raw = args(&[
            ("file_path", json!("src/lib.rs")),
            ("start_line", json!(5)),
            ("end_line", json!(10)),
        ]);
        assert!(validate(tool, &raw).is_ok());
    }

    #[test]
    fn enum_membership_is_enforced() {
        let tool = registry::find("explore").unwrap();
        let raw = args(&[("name", json!("Foo")), ("type", json!("bogus"))]);
        assert!(validate(tool, &raw).is_err());
    }

    #[test]
    fn min_items_on_array_is_enforced() {
        let tool = registry::find("highlight").unwrap();
        let raw = args(&[("node_ids", json!([]))]);
        assert!(validate(tool, &raw).is_err());
    }

    #[test]
    fn validating_normalized_output_yields_itself() {
        let tool = registry::find("search").unwrap();
        let raw = args(&[("query", json!("hello"))]);
        let once = validate(tool, &raw).unwrap();
        let twice = validate(tool, &once).unwrap();
        assert_eq!(once, twice);
    }
}
