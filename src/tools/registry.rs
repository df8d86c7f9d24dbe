//! Tool registry - static enumeration of capabilities and their contracts
//!
//! Populated once at startup from fixed configuration and read-only after,
//! so the capability set cannot change mid-task.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Result, SleuthError};
use crate::tools::{ANALYZE_STRUCTURE, EXECUTE_QUERY, FINAL_ANSWER, GET_TABLE_STRUCTURE, GET_TABLES};

/// Immutable description of one capability's contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    /// Human-readable description for the reasoning component
    pub description: String,
    /// JSON schema for input parameters
    pub input_schema: Value,
    /// JSON schema sketch of the success payload
    pub output_schema: Value,
    /// Named failure kinds this tool can report
    pub error_modes: Vec<String>,
}

impl ToolDescriptor {
    fn new(
        name: &str,
        description: &str,
        input_schema: Value,
        output_schema: Value,
        error_modes: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            output_schema,
            error_modes: error_modes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Read-only registry of every capability available to the loop
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    descriptors: HashMap<String, ToolDescriptor>,
    /// Declaration order, kept stable for prompt rendering
    order: Vec<String>,
}

impl ToolRegistry {
    /// Build the registry with the built-in capability set
    pub fn builtin() -> Self {
        let mut registry = Self {
            descriptors: HashMap::new(),
            order: Vec::new(),
        };

        registry.add(ToolDescriptor::new(
            GET_TABLES,
            "Get the list of all tables in the database",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "table_name": { "type": "string" } }
                }
            }),
            &["gateway_error"],
        ));

        registry.add(ToolDescriptor::new(
            GET_TABLE_STRUCTURE,
            "Get the schema/structure of a specific table",
            json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to get structure for"
                    }
                },
                "required": ["table_name"]
            }),
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "Table": { "type": "string" },
                        "Create Table": { "type": "string" }
                    }
                }
            }),
            &["unknown_table", "gateway_error"],
        ));

        registry.add(ToolDescriptor::new(
            ANALYZE_STRUCTURE,
            "Analyze database structure and generate a SQL query for the given task",
            json!({
                "type": "object",
                "properties": {
                    "table_structures": {
                        "type": "object",
                        "description": "Mapping of table name to create statement"
                    },
                    "task_description": {
                        "type": "string",
                        "description": "Description of what needs to be queried"
                    }
                },
                "required": ["table_structures", "task_description"]
            }),
            json!({ "type": "string", "description": "Raw SQL query text" }),
            &["empty_reply"],
        ));

        registry.add(ToolDescriptor::new(
            EXECUTE_QUERY,
            "Execute a SQL query against the database",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL query to execute"
                    }
                },
                "required": ["query"]
            }),
            json!({
                "type": "array",
                "items": { "type": "object" }
            }),
            &["syntax_error", "gateway_error"],
        ));

        registry.add(ToolDescriptor::new(
            FINAL_ANSWER,
            "Submit the query results to the central system when the task is solved",
            json!({
                "type": "object",
                "properties": {
                    "answer": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The final answer values"
                    }
                },
                "required": ["answer"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "code": { "type": "integer" },
                    "message": { "type": "string" }
                }
            }),
            &["rejected", "gateway_error"],
        ));

        registry
    }

    fn add(&mut self, descriptor: ToolDescriptor) {
        self.order.push(descriptor.name.clone());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a capability's contract
    pub fn describe(&self, tool_name: &str) -> Result<&ToolDescriptor> {
        self.descriptors
            .get(tool_name)
            .ok_or_else(|| SleuthError::UnknownTool(tool_name.to_string()))
    }

    /// All descriptors in declaration order
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.descriptors.get(name))
            .collect()
    }

    /// All capability names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Whether a capability is registered
    pub fn has(&self, tool_name: &str) -> bool {
        self.descriptors.contains_key(tool_name)
    }
}
