//! Planner - reasoning-backed plan seeding and revision
//!
//! Produces a fresh plan each cycle from the task, the existing plan, and the
//! full trace. Parsed plans are annotated against the trace so steps whose
//! intent is already satisfied show up as done.

use std::sync::Arc;

use crate::domain::{Action, ExecutionResult, Plan, StepStatus, Task, Trace};
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient};
use crate::tools::{
    ANALYZE_STRUCTURE, EXECUTE_QUERY, GET_TABLE_STRUCTURE, GET_TABLES, ToolRegistry,
};

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Produce the initial plan for a task
    pub async fn seed(&self, task: &Task, trace: &Trace) -> Result<Plan> {
        self.plan(task, None, trace).await
    }

    /// Produce a revised plan reflecting everything learned so far
    pub async fn revise(&self, task: &Task, current: &Plan, trace: &Trace) -> Result<Plan> {
        self.plan(task, Some(current), trace).await
    }

    async fn plan(&self, task: &Task, current: Option<&Plan>, trace: &Trace) -> Result<Plan> {
        let existing = match current {
            Some(plan) => plan.render(),
            None => "No plan yet. You need to create one.".to_string(),
        };

        let system = format!(
            "As master planner, create and refine a plan of action that leads to the final \
             answer. We are at one stage within a loop, planning only the current iteration.\n\n\
             Rules:\n\
             - Speak concisely; make every word count\n\
             - Pay attention to the existing plan, the available tools and the actions taken\n\
             - Be hyper precise when mentioning tool names\n\
             - When ready to answer, plan the final_answer tool\n\
             - The plan MUST be a bullet list in the format `- tool: note`, where tool is an \
               exact name from the available tools; an optional short *thinking* preamble may \
               precede the bullets\n\n\
             <available_tools>\n{}</available_tools>\n\n\
             <existing_plan>\n{}\n</existing_plan>\n\n\
             <actions_taken>\n{}</actions_taken>",
            render_tools(&self.registry),
            existing,
            render_trace(trace),
        );

        let request = CompletionRequest::new(system)
            .with_user_message(format!("Objective: {}\n\nLet's start planning!", task.goal));
        let response = self.llm.complete(request).await?;

        let known = self.registry.names();
        let mut plan = Plan::parse(&response.content, &known)?;
        annotate_statuses(&mut plan, trace);

        tracing::debug!(steps = plan.steps.len(), "Plan revised");
        Ok(plan)
    }

    /// Ask for a short reflection on the last executed action, diagnostic only
    pub async fn reflect(
        &self,
        task: &Task,
        action: &Action,
        result: &ExecutionResult,
    ) -> Result<String> {
        let system = format!(
            "Reflect on an action the system just performed, like a detective writing a \
             self-note about whether the result moves us towards the final goal. Speak \
             concisely; include every detail worth keeping, as any other context will be \
             lost.\n\n\
             <objective>\n{}\n</objective>\n\n\
             <last_action>\n<name>{}</name>\n<payload>{}</payload>\n<result>{}</result>\n\
             </last_action>",
            task.goal,
            action.tool_name,
            action.arguments,
            render_result(result),
        );

        let request = CompletionRequest::new(system).with_user_message("Write the reflection.");
        let response = self.llm.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}

/// Render the registry as a bullet list for prompting
fn render_tools(registry: &ToolRegistry) -> String {
    registry
        .list()
        .iter()
        .map(|d| format!("- {}: {}\n", d.name, d.description))
        .collect()
}

/// Render the trace as action blocks for prompting
fn render_trace(trace: &Trace) -> String {
    if trace.is_empty() {
        return "No actions taken yet.\n".to_string();
    }

    trace
        .entries()
        .iter()
        .map(|entry| {
            let mut block = format!(
                "<action>\n<name>{}</name>\n<payload>{}</payload>\n<result>{}</result>\n",
                entry.action.tool_name,
                entry.action.arguments,
                render_result(&entry.result),
            );
            if let Some(reflection) = &entry.reflection {
                block.push_str(&format!("<reflection>{}</reflection>\n", reflection));
            }
            block.push_str("</action>\n");
            block
        })
        .collect()
}

fn render_result(result: &ExecutionResult) -> String {
    if result.is_ok() {
        result.payload.to_string()
    } else {
        format!(
            "ERROR: {}",
            result.error_detail.as_deref().unwrap_or("unknown")
        )
    }
}

/// Mark steps whose intent the trace already satisfies as done
fn annotate_statuses(plan: &mut Plan, trace: &Trace) {
    let listed = trace.listed_tables();
    let structures = trace.table_structures();
    let all_structures_known =
        !listed.is_empty() && listed.iter().all(|t| structures.contains_key(t));

    for step in &mut plan.steps {
        let satisfied = match step.tool_name.as_str() {
            GET_TABLES => trace.has_succeeded(GET_TABLES),
            GET_TABLE_STRUCTURE => all_structures_known,
            ANALYZE_STRUCTURE => trace.has_succeeded(ANALYZE_STRUCTURE),
            EXECUTE_QUERY => trace.has_succeeded(EXECUTE_QUERY),
            _ => false,
        };
        if satisfied {
            step.status = StepStatus::Done;
        }
    }
}
