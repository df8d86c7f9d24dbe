//! Error types for dbsleuth
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in dbsleuth
#[derive(Debug, Error)]
pub enum SleuthError {
    /// A tool name was selected that is not present in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments repeatedly failed a tool's input schema
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// A precondition for building tool arguments is missing from the trace
    #[error("Argument construction failed: {0}")]
    ArgumentConstruction(String),

    /// The reasoning component produced a plan that could not be parsed
    #[error("Plan parse error: {0}")]
    PlanParse(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Database gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for dbsleuth operations
pub type Result<T> = std::result::Result<T, SleuthError>;
