//! Describer - builds the concrete argument payload for a selected tool
//!
//! Derived content is synthesized from the trace, never re-requested: table
//! structures feed analyze_structure, its query feeds execute_query, and the
//! query rows feed final_answer. Only the table picker consults the reasoning
//! component. A missing precondition is an ArgumentConstruction error, which
//! the controller answers with a forced plan revision.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::domain::{Plan, Task, Trace};
use crate::error::{Result, SleuthError};
use crate::llm::{CompletionRequest, LlmClient, extract_json};
use crate::tools::{
    ANALYZE_STRUCTURE, EXECUTE_QUERY, FINAL_ANSWER, GET_TABLE_STRUCTURE, GET_TABLES,
    ToolDescriptor,
};

pub struct Describer {
    llm: Arc<dyn LlmClient>,
}

impl Describer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Build an argument payload conforming to the tool's input schema
    pub async fn build_arguments(
        &self,
        descriptor: &ToolDescriptor,
        task: &Task,
        plan: &Plan,
        trace: &Trace,
    ) -> Result<Value> {
        match descriptor.name.as_str() {
            GET_TABLES => Ok(json!({})),
            GET_TABLE_STRUCTURE => self.pick_table(descriptor, plan, trace).await,
            ANALYZE_STRUCTURE => build_analyze_arguments(task, trace),
            EXECUTE_QUERY => build_query_arguments(trace),
            FINAL_ANSWER => build_answer_arguments(trace),
            other => Err(SleuthError::UnknownTool(other.to_string())),
        }
    }

    /// Ask the reasoning component which table to inspect next
    async fn pick_table(
        &self,
        descriptor: &ToolDescriptor,
        plan: &Plan,
        trace: &Trace,
    ) -> Result<Value> {
        let listed = trace.listed_tables();
        if listed.is_empty() {
            return Err(SleuthError::ArgumentConstruction(
                "no table listing in trace; get_tables must run first".to_string(),
            ));
        }

        let fetched: Vec<String> = trace.table_structures().keys().cloned().collect();

        let system = format!(
            "Use the tool {} by generating a SINGLE valid JSON string as response and \
             NOTHING else, in the form {{\"_thoughts\": \"1-3 sentences\", \
             \"table_name\": \"exact table name\"}}.\n\n\
             Rules:\n\
             - Pick a table from the known listing whose structure is still missing\n\
             - Pay attention to details, especially spellings and names\n\n\
             <known_tables>\n{}\n</known_tables>\n\n\
             <structures_already_fetched>\n{}\n</structures_already_fetched>\n\n\
             <existing_plan>\n{}\n</existing_plan>",
            descriptor.name,
            listed.join("\n"),
            if fetched.is_empty() {
                "none".to_string()
            } else {
                fetched.join("\n")
            },
            plan.render(),
        );

        let request =
            CompletionRequest::new(system).with_user_message("Produce the JSON payload.");
        let response = self.llm.complete(request).await?;

        let payload = extract_json(&response.content)?;
        Ok(strip_thoughts(payload))
    }
}

/// Assemble analyze_structure arguments from the trace
fn build_analyze_arguments(task: &Task, trace: &Trace) -> Result<Value> {
    let structures = trace.table_structures();
    if structures.is_empty() {
        return Err(SleuthError::ArgumentConstruction(
            "no table structures in trace; get_table_structure must run first".to_string(),
        ));
    }

    let mut map = Map::new();
    for (table, create) in structures {
        map.insert(table, Value::String(create));
    }

    Ok(json!({
        "table_structures": Value::Object(map),
        "task_description": task.goal,
    }))
}

/// Pull the synthesized query out of the trace
fn build_query_arguments(trace: &Trace) -> Result<Value> {
    let query = trace
        .latest_ok_payload(ANALYZE_STRUCTURE)
        .and_then(|p| p.as_str())
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            SleuthError::ArgumentConstruction(
                "no synthesized query in trace; analyze_structure must run first".to_string(),
            )
        })?;

    Ok(json!({ "query": query.trim() }))
}

/// Extract the answer values from the latest query result rows
fn build_answer_arguments(trace: &Trace) -> Result<Value> {
    let rows = trace
        .latest_ok_payload(EXECUTE_QUERY)
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            SleuthError::ArgumentConstruction(
                "no query results in trace; execute_query must run first".to_string(),
            )
        })?;

    let answer: Vec<Value> = rows
        .iter()
        .filter_map(|row| row.as_object())
        .filter_map(|obj| obj.values().next())
        .map(|v| match v {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        })
        .collect();

    Ok(json!({ "answer": answer }))
}

/// Drop the diagnostic `_thoughts` property from a generated payload
fn strip_thoughts(mut payload: Value) -> Value {
    if let Some(obj) = payload.as_object_mut() {
        obj.remove("_thoughts");
    }
    payload
}
