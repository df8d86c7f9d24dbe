//! analyze_structure tool - synthesize a SQL query from known structures
//!
//! This tool's collaborator is the reasoning component itself: given the
//! accumulated create statements and a task description it returns raw SQL
//! text. An empty reply is the failure signal; there is no error field.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, SleuthError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::tools::{ANALYZE_STRUCTURE, Tool};

const SQL_EXPERT_PROMPT: &str = "You are a SQL expert. Your task is to analyze the database \
structure and create a SQL query that will solve the given task. Focus on writing correct SQL \
that will work with the given database structure. Return pure SQL, nothing else - no extra \
formatting, no code fences.";

pub struct AnalyzeStructureTool {
    llm: Arc<dyn LlmClient>,
}

impl AnalyzeStructureTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn render_structures(table_structures: &Value) -> String {
        match table_structures.as_object() {
            Some(map) => map
                .iter()
                .map(|(table, create)| {
                    format!("-- {}\n{}", table, create.as_str().unwrap_or_default())
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            None => table_structures.to_string(),
        }
    }

    /// Strip code fences the model sometimes adds despite instructions
    fn clean_sql(text: &str) -> String {
        let trimmed = text.trim();
        let without_fence = trimmed
            .strip_prefix("```sql")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        without_fence.trim_end_matches("```").trim().to_string()
    }
}

#[async_trait]
impl Tool for AnalyzeStructureTool {
    fn name(&self) -> &'static str {
        ANALYZE_STRUCTURE
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let structures = input
            .get("table_structures")
            .ok_or_else(|| SleuthError::Tool("missing 'table_structures' parameter".into()))?;
        let task_description = input["task_description"]
            .as_str()
            .ok_or_else(|| SleuthError::Tool("missing 'task_description' parameter".into()))?;

        let user_message = format!(
            "Given the following database structure:\n{}\n\n\
             Create a SQL query that will solve this task:\n{}\n\n\
             Return only the SQL query, nothing else.",
            Self::render_structures(structures),
            task_description
        );

        let request = CompletionRequest::new(SQL_EXPERT_PROMPT).with_user_message(user_message);
        let response = self.llm.complete(request).await?;
        let sql = Self::clean_sql(&response.content);

        tracing::debug!(query = %sql, "Synthesized SQL query");
        Ok(Value::String(sql))
    }
}
