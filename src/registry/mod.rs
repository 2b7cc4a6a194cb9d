// src/registry/mod.rs
// Static catalogue of read-only code-analysis tools. Immutable after
// process start; additions require a release (spec §4.B).

pub mod catalogue;

use lazy_static::lazy_static;
use serde_json::{Map, Value};
use std::collections::HashMap;

lazy_static! {
    static ref REGISTRY: Vec<ToolDescriptor> = catalogue::build();
    static ref BY_NAME: HashMap<&'static str, usize> = REGISTRY
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name, i))
        .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Quick,
    Heavy,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    StringArray,
}

/// Validation/shape rules for a single tool-argument field. Built with the
/// small builder below rather than a struct literal so the 15-entry
/// catalogue in `catalogue.rs` reads as a declaration, not a data dump.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    pub min_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_items: Option<usize>,
    pub enum_values: Option<&'static [&'static str]>,
    pub default: Option<Value>,
}

impl FieldSchema {
    fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            min_length: None,
            min: None,
            max: None,
            min_items: None,
            enum_values: None,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn string_array() -> Self {
        Self::new(FieldType::StringArray)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn enum_values(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn default_bool(mut self, value: bool) -> Self {
        self.default = Some(Value::Bool(value));
        self
    }

    pub fn default_int(mut self, value: i64) -> Self {
        self.default = Some(Value::Number(value.into()));
        self
    }

    pub fn default_str(mut self, value: &str) -> Self {
        self.default = Some(Value::String(value.to_string()));
        self
    }

    pub fn default_float(mut self, value: f64) -> Self {
        self.default = Some(serde_json::json!(value));
        self
    }

    /// Render as the structural JSON-Schema fragment the agent sees.
    fn to_json_schema(&self) -> Value {
        let mut obj = Map::new();
        let type_name = match self.field_type {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "number",
            FieldType::Boolean => "boolean",
            FieldType::StringArray => "array",
        };
        obj.insert("type".into(), Value::String(type_name.into()));

        if matches!(self.field_type, FieldType::StringArray) {
            obj.insert(
                "items".into(),
                serde_json::json!({ "type": "string" }),
            );
            if let Some(n) = self.min_items {
                obj.insert("minItems".into(), Value::Number(n.into()));
            }
        }
        if let Some(n) = self.min_length {
            obj.insert("minLength".into(), Value::Number(n.into()));
        }
        if let Some(min) = self.min {
            obj.insert("minimum".into(), serde_json::json!(min));
        }
        if let Some(max) = self.max {
            obj.insert("maximum".into(), serde_json::json!(max));
        }
        if let Some(values) = self.enum_values {
            obj.insert("enum".into(), serde_json::json!(values));
        }
        if let Some(default) = &self.default {
            obj.insert("default".into(), default.clone());
        }
        Value::Object(obj)
    }
}

/// Immutable tool descriptor: name, agent-facing prose, input schema,
/// quick/heavy category.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: ToolCategory,
    pub fields: Vec<(&'static str, FieldSchema)>,
}

impl ToolDescriptor {
    /// Render the structural JSON-Schema object the MCP `tools/list`
    /// response exposes to the agent.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, field) in &self.fields {
            properties.insert(name.to_string(), field.to_json_schema());
            if field.required {
                required.push(Value::String(name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        schema.insert("additionalProperties".into(), Value::Bool(false));
        schema
    }

    pub fn timeout_ms(&self, quick_ms: u64, heavy_ms: u64) -> u64 {
        match self.category {
            ToolCategory::Quick => quick_ms,
            ToolCategory::Heavy => heavy_ms,
        }
    }
}

/// All 15 tool descriptors, in catalogue order.
pub fn all() -> &'static [ToolDescriptor] {
    &REGISTRY
}

/// Look up a tool descriptor by its unprefixed MCP-surface name.
pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    BY_NAME.get(name).map(|&i| &REGISTRY[i])
}
