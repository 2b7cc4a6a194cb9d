// src/registry/catalogue.rs
// The 15-tool external contract, verbatim from the tool catalogue table.

use super::{FieldSchema, ToolCategory, ToolDescriptor};

pub fn build() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "context",
            description: "Project stats, top hotspots, folder tree, tool list, and schema.",
            category: ToolCategory::Quick,
            fields: vec![],
        },
        ToolDescriptor {
            name: "search",
            description: "Hybrid keyword and semantic search over the codebase.",
            category: ToolCategory::Quick,
            fields: vec![
                ("query", FieldSchema::string().required().min_length(1)),
                (
                    "limit",
                    FieldSchema::integer().range(1.0, 100.0).default_int(10),
                ),
                (
                    "group_by_process",
                    FieldSchema::boolean().default_bool(true),
                ),
            ],
        },
        ToolDescriptor {
            name: "cypher",
            description: "Run a read-only graph query. Subject to the query firewall.",
            category: ToolCategory::Heavy,
            fields: vec![("query", FieldSchema::string().required().min_length(1))],
        },
        ToolDescriptor {
            name: "grep",
            description: "Regex search over file contents.",
            category: ToolCategory::Quick,
            fields: vec![
                ("pattern", FieldSchema::string().required().min_length(1)),
                (
                    "case_sensitive",
                    FieldSchema::boolean().default_bool(false),
                ),
                (
                    "max_results",
                    FieldSchema::integer().range(1.0, 500.0).default_int(50),
                ),
            ],
        },
        ToolDescriptor {
            name: "read",
            description: "Read a file, optionally limited to a line range.",
            category: ToolCategory::Quick,
            fields: vec![
                ("file_path", FieldSchema::string().required().min_length(1)),
                ("start_line", FieldSchema::integer().range(1.0, f64::MAX)),
                ("end_line", FieldSchema::integer().range(1.0, f64::MAX)),
            ],
        },
        ToolDescriptor {
            name: "explore",
            description: "Inspect a single symbol, cluster, or process node.",
            category: ToolCategory::Heavy,
            fields: vec![
                ("name", FieldSchema::string().required().min_length(1)),
                (
                    "type",
                    FieldSchema::string()
                        .required()
                        .enum_values(&["symbol", "cluster", "process"]),
                ),
            ],
        },
        ToolDescriptor {
            name: "overview",
            description: "Summary of processes and clusters in the codebase.",
            category: ToolCategory::Quick,
            fields: vec![
                (
                    "show_processes",
                    FieldSchema::boolean().default_bool(true),
                ),
                ("show_clusters", FieldSchema::boolean().default_bool(true)),
                (
                    "limit",
                    FieldSchema::integer().range(1.0, 100.0).default_int(20),
                ),
            ],
        },
        ToolDescriptor {
            name: "impact",
            description: "Trace upstream/downstream impact from a target node.",
            category: ToolCategory::Heavy,
            fields: vec![
                ("target", FieldSchema::string().required().min_length(1)),
                (
                    "direction",
                    FieldSchema::string()
                        .required()
                        .enum_values(&["upstream", "downstream"]),
                ),
                (
                    "max_depth",
                    FieldSchema::integer().range(1.0, 10.0).default_int(3),
                ),
                ("relation_types", FieldSchema::string_array()),
                (
                    "include_tests",
                    FieldSchema::boolean().default_bool(false),
                ),
                (
                    "min_confidence",
                    FieldSchema::float().range(0.0, 1.0).default_float(0.7),
                ),
            ],
        },
        ToolDescriptor {
            name: "highlight",
            description: "Highlight a set of nodes in the browser UI. Side-effecting.",
            category: ToolCategory::Quick,
            fields: vec![
                (
                    "node_ids",
                    FieldSchema::string_array().required().min_items(1),
                ),
                ("color", FieldSchema::string()),
            ],
        },
        ToolDescriptor {
            name: "diff",
            description: "Diff the working tree against a baseline index.",
            category: ToolCategory::Quick,
            fields: vec![
                (
                    "baseline",
                    FieldSchema::string().default_str("last_index"),
                ),
                (
                    "include_content",
                    FieldSchema::boolean().default_bool(false),
                ),
                (
                    "filter",
                    FieldSchema::string()
                        .enum_values(&["all", "added", "modified", "deleted"])
                        .default_str("all"),
                ),
            ],
        },
        ToolDescriptor {
            name: "deep_dive",
            description: "Composite of explore, impact, and read for a single symbol.",
            category: ToolCategory::Quick,
            fields: vec![("name", FieldSchema::string().required().min_length(1))],
        },
        ToolDescriptor {
            name: "review_file",
            description: "Composite review of a single file.",
            category: ToolCategory::Quick,
            fields: vec![("file_path", FieldSchema::string().required().min_length(1))],
        },
        ToolDescriptor {
            name: "trace_flow",
            description: "Trace a call/data flow from one symbol toward another.",
            category: ToolCategory::Quick,
            fields: vec![
                ("from", FieldSchema::string().required().min_length(1)),
                ("to", FieldSchema::string()),
                (
                    "max_steps",
                    FieldSchema::integer().range(1.0, 20.0).default_int(10),
                ),
            ],
        },
        ToolDescriptor {
            name: "find_similar",
            description: "Find symbols structurally or semantically similar to one given.",
            category: ToolCategory::Quick,
            fields: vec![
                ("name", FieldSchema::string().required().min_length(1)),
                (
                    "limit",
                    FieldSchema::integer().range(1.0, 20.0).default_int(5),
                ),
            ],
        },
        ToolDescriptor {
            name: "test_impact",
            description: "Suggest tests impacted by a set of changed files.",
            category: ToolCategory::Quick,
            fields: vec![
                (
                    "changed_files",
                    FieldSchema::string_array().required().min_items(1),
                ),
                (
                    "max_depth",
                    FieldSchema::integer().range(1.0, 5.0).default_int(2),
                ),
                (
                    "suggest_tests",
                    FieldSchema::boolean().default_bool(true),
                ),
            ],
        },
    ]
}
