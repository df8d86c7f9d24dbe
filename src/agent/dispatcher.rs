//! Tool dispatcher - validates arguments and invokes tool implementations
//!
//! Validation happens against the registry descriptor before the tool runs;
//! a failing payload never reaches the collaborator. Every tool-level failure
//! is converted into an error ExecutionResult, never raised past here. Only
//! an unregistered tool name escapes as a hard error.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Action, ExecutionResult};
use crate::error::{Result, SleuthError};
use crate::tools::{Tool, ToolDescriptor, ToolRegistry};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolDispatcher {
    /// Create a dispatcher with no implementations registered
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            tools: HashMap::new(),
        }
    }

    /// Register a tool implementation
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Check if an implementation is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of registered implementations
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch one action, producing exactly one ExecutionResult
    pub async fn invoke(&self, action: &Action) -> Result<ExecutionResult> {
        let descriptor = self.registry.describe(&action.tool_name)?;

        if let Err(detail) = validate_arguments(descriptor, &action.arguments) {
            tracing::warn!(tool = %action.tool_name, detail = %detail, "Rejecting invalid arguments");
            return Ok(ExecutionResult::schema_violation(detail));
        }

        let tool = self.tools.get(&action.tool_name).ok_or_else(|| {
            SleuthError::Tool(format!(
                "no implementation registered for '{}'",
                action.tool_name
            ))
        })?;

        let result = match tool.execute(action.arguments.clone()).await {
            Ok(reply) => ExecutionResult::from_reply(reply),
            Err(e) => ExecutionResult::error(e.to_string()),
        };

        tracing::info!(
            tool = %action.tool_name,
            ok = result.is_ok(),
            "Dispatched tool"
        );
        Ok(result)
    }
}

/// Validate an argument payload against a descriptor's input schema
///
/// Checks that the payload is an object, that required fields are present,
/// and that declared property types match.
fn validate_arguments(
    descriptor: &ToolDescriptor,
    arguments: &Value,
) -> std::result::Result<(), String> {
    let schema = &descriptor.input_schema;

    let Some(args) = arguments.as_object() else {
        return Err(format!(
            "tool '{}' arguments must be an object",
            descriptor.name
        ));
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field in required.iter().filter_map(|f| f.as_str()) {
            if !args.contains_key(field) {
                return Err(format!(
                    "tool '{}' missing required field: {}",
                    descriptor.name, field
                ));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (field, spec) in properties {
            let Some(value) = args.get(field) else {
                continue;
            };
            let Some(expected) = spec.get("type").and_then(|t| t.as_str()) else {
                continue;
            };
            let matches = match expected {
                "string" => value.is_string(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                _ => true,
            };
            if !matches {
                return Err(format!(
                    "tool '{}' field '{}' must be of type {}",
                    descriptor.name, field, expected
                ));
            }
        }
    }

    Ok(())
}
