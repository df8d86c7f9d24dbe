//! Decider - selects the next tool to invoke
//!
//! The reasoning component picks a tool from the registry given the current
//! plan and trace. A redundancy guard keeps it from re-fetching discovery
//! data the trace already holds.

use std::sync::Arc;

use crate::domain::{Plan, Trace};
use crate::error::{Result, SleuthError};
use crate::llm::{CompletionRequest, LlmClient, extract_json};
use crate::tools::{GET_TABLE_STRUCTURE, GET_TABLES, ToolRegistry};

/// The decider's choice for one cycle
#[derive(Debug, Clone)]
pub struct Selection {
    pub tool_name: String,
    /// The `_thoughts` behind the choice, diagnostic only
    pub rationale: String,
}

pub struct Decider {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl Decider {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Select the next tool given the current plan and trace
    ///
    /// The chosen name must exist in the registry; an unregistered choice is
    /// a fatal controller-level error.
    pub async fn select(&self, plan: &Plan, trace: &Trace) -> Result<Selection> {
        let system = format!(
            "As a strategist, select the very next tool to get closer to the final answer, \
             or final_answer when ready. We are at one stage within a loop, deciding only \
             the next step.\n\n\
             Rules:\n\
             - Answer with JSON and NOTHING else, in the form \
               {{\"_thoughts\": \"1-3 sentences\", \"tool\": \"exact tool name\"}}\n\
             - Be hyper precise when mentioning tool names\n\
             - Pay attention to the existing plan and the actions taken; do not repeat \
               yourself without a clear reason\n\n\
             <available_tools>\n{}</available_tools>\n\n\
             <existing_plan>\n{}\n</existing_plan>\n\n\
             <actions_taken>\n{}</actions_taken>",
            render_tools(&self.registry),
            plan.render(),
            render_trace(trace),
        );

        let request =
            CompletionRequest::new(system).with_user_message("Let's decide what to do next!");
        let response = self.llm.complete(request).await?;

        let decision = extract_json(&response.content)?;
        let tool_name = decision["tool"]
            .as_str()
            .ok_or_else(|| {
                SleuthError::Llm(format!("decision lacks a 'tool' field: {}", decision))
            })?
            .to_string();
        let rationale = decision["_thoughts"].as_str().unwrap_or_default().to_string();

        // Unregistered selection is a controller bug, not a recoverable error
        self.registry.describe(&tool_name)?;

        if let Some(fallback) = self.redundancy_fallback(&tool_name, plan, trace) {
            tracing::warn!(
                chosen = %tool_name,
                fallback = %fallback,
                "Redundant selection; falling back to next actionable plan step"
            );
            return Ok(Selection {
                tool_name: fallback,
                rationale: format!("redundant {} skipped; {}", tool_name, rationale),
            });
        }

        Ok(Selection { tool_name, rationale })
    }

    /// If the chosen discovery tool would re-fetch known data, pick the first
    /// actionable pending plan step instead
    fn redundancy_fallback(&self, tool_name: &str, plan: &Plan, trace: &Trace) -> Option<String> {
        if !is_redundant(tool_name, trace) {
            return None;
        }

        plan.pending_tools()
            .into_iter()
            .find(|t| *t != tool_name && self.registry.has(t) && !is_redundant(t, trace))
            .map(String::from)
    }
}

/// Whether invoking the tool would only re-fetch data already in the trace
fn is_redundant(tool_name: &str, trace: &Trace) -> bool {
    match tool_name {
        GET_TABLES => trace.has_succeeded(GET_TABLES),
        GET_TABLE_STRUCTURE => {
            let listed = trace.listed_tables();
            let structures = trace.table_structures();
            !listed.is_empty() && listed.iter().all(|t| structures.contains_key(t))
        }
        _ => false,
    }
}

fn render_tools(registry: &ToolRegistry) -> String {
    registry
        .list()
        .iter()
        .map(|d| format!("- {}: {}\n", d.name, d.description))
        .collect()
}

fn render_trace(trace: &Trace) -> String {
    if trace.is_empty() {
        return "No actions taken yet.\n".to_string();
    }

    trace
        .entries()
        .iter()
        .map(|entry| {
            format!(
                "<action>\n<name>{}</name>\n<result>{}</result>\n</action>\n",
                entry.action.tool_name,
                if entry.result.is_ok() {
                    entry.result.payload.to_string()
                } else {
                    format!(
                        "ERROR: {}",
                        entry.result.error_detail.as_deref().unwrap_or("unknown")
                    )
                }
            )
        })
        .collect()
}
