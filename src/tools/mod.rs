//! Tool system for the agent loop
//!
//! Tools are the loop's only way to affect the outside world: database schema
//! introspection, query execution, SQL synthesis, and answer submission. The
//! registry describes their contracts; implementations live one per file.

pub mod analyze_structure;
pub mod execute_query;
pub mod final_answer;
pub mod gateway;
pub mod get_tables;
pub mod registry;
pub mod table_structure;

pub use analyze_structure::AnalyzeStructureTool;
pub use execute_query::ExecuteQueryTool;
pub use final_answer::FinalAnswerTool;
pub use gateway::{DbGateway, HttpDbGateway, MockDbGateway};
pub use get_tables::GetTablesTool;
pub use registry::{ToolDescriptor, ToolRegistry};
pub use table_structure::TableStructureTool;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// List all tables in the database
pub const GET_TABLES: &str = "get_tables";
/// Fetch the create statement for one table
pub const GET_TABLE_STRUCTURE: &str = "get_table_structure";
/// Synthesize a SQL query from known structures and a task description
pub const ANALYZE_STRUCTURE: &str = "analyze_structure";
/// Run a SQL query against the database
pub const EXECUTE_QUERY: &str = "execute_query";
/// Submit the final answer to the central system; terminal capability
pub const FINAL_ANSWER: &str = "final_answer";

/// A capability the loop can dispatch
///
/// Implementations return the raw collaborator reply; the dispatcher
/// interprets it into an ExecutionResult.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches its registry descriptor)
    fn name(&self) -> &'static str;

    /// Execute with validated arguments
    async fn execute(&self, input: Value) -> Result<Value>;
}
