//! Plan values
//!
//! A plan is an ordered list of intended steps, each naming a tool and a
//! rationale. Plans are immutable once stored; revision produces a new value.
//! Plan text from the reasoning component follows the bullet template
//! `- tool: note`, optionally preceded by a `*thinking*` preamble.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SleuthError};

/// Status of a single plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Done,
    Failed,
}

/// One intended step: a tool plus a short rationale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool_name: String,
    pub rationale: String,
    pub status: StepStatus,
}

impl PlanStep {
    /// Create a pending step
    pub fn new(tool_name: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            rationale: rationale.into(),
            status: StepStatus::Pending,
        }
    }
}

/// An ordered, immutable plan revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Revision number, assigned by the plan store
    pub revision: u32,
    /// Preamble text from the reasoning component, diagnostic only
    pub thinking: Option<String>,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Parse plan text in the bullet template into a plan
    ///
    /// Bullets naming tools outside `known_tools` are dropped. Text before the
    /// first bullet becomes the thinking preamble. A plan with no usable steps
    /// is a parse error.
    pub fn parse(text: &str, known_tools: &[&str]) -> Result<Self> {
        let mut thinking_lines: Vec<&str> = Vec::new();
        let mut steps: Vec<PlanStep> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(bullet) = trimmed.strip_prefix("- ") {
                let (tool_part, note) = match bullet.split_once(':') {
                    Some((tool, note)) => (tool, note.trim()),
                    None => (bullet, ""),
                };
                let tool = tool_part.trim().trim_matches(['`', '*', ' ']);
                if known_tools.contains(&tool) {
                    steps.push(PlanStep::new(tool, note));
                } else {
                    tracing::debug!(tool = %tool, "Dropping plan bullet naming unknown tool");
                }
            } else if steps.is_empty() && !trimmed.is_empty() {
                thinking_lines.push(trimmed);
            }
        }

        if steps.is_empty() {
            return Err(SleuthError::PlanParse(format!(
                "no actionable steps in plan text: {}",
                text.trim()
            )));
        }

        let thinking = if thinking_lines.is_empty() {
            None
        } else {
            Some(thinking_lines.join("\n"))
        };

        Ok(Self {
            revision: 0,
            thinking,
            steps,
        })
    }

    /// First step still pending, in declared order
    pub fn first_pending(&self) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    /// Tool names of all pending steps, in declared order
    pub fn pending_tools(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .map(|s| s.tool_name.as_str())
            .collect()
    }

    /// Whether any pending step names the given tool
    pub fn has_pending(&self, tool_name: &str) -> bool {
        self.pending_tools().contains(&tool_name)
    }

    /// Render the plan back into the bullet template for prompting
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(thinking) = &self.thinking {
            out.push_str(thinking);
            out.push_str("\n\n");
        }
        for step in &self.steps {
            let marker = match step.status {
                StepStatus::Pending => "",
                StepStatus::Done => " [done]",
                StepStatus::Failed => " [failed]",
            };
            out.push_str(&format!("- {}: {}{}\n", step.tool_name, step.rationale, marker));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &[
        "get_tables",
        "get_table_structure",
        "analyze_structure",
        "execute_query",
        "final_answer",
    ];

    #[test]
    fn test_parse_full_template() {
        let text = "*thinking* I need the schema before I can build a query.\n\n\
                    - get_tables: list every table\n\
                    - get_table_structure: fetch schemas for relevant tables\n\
                    - final_answer: report the ids";

        let plan = Plan::parse(text, KNOWN).unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].tool_name, "get_tables");
        assert_eq!(plan.steps[1].rationale, "fetch schemas for relevant tables");
        assert!(plan.thinking.as_deref().unwrap().contains("schema"));
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_parse_drops_unknown_tools() {
        let text = "- get_tables: list\n- make_coffee: brew\n- execute_query: run";
        let plan = Plan::parse(text, KNOWN).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].tool_name, "execute_query");
    }

    #[test]
    fn test_parse_strips_backticks() {
        let text = "- `get_tables`: list tables";
        let plan = Plan::parse(text, KNOWN).unwrap();
        assert_eq!(plan.steps[0].tool_name, "get_tables");
    }

    #[test]
    fn test_parse_bullet_without_note() {
        let text = "- get_tables";
        let plan = Plan::parse(text, KNOWN).unwrap();
        assert_eq!(plan.steps[0].tool_name, "get_tables");
        assert_eq!(plan.steps[0].rationale, "");
    }

    #[test]
    fn test_parse_no_steps_is_error() {
        let result = Plan::parse("*thinking* nothing actionable here", KNOWN);
        assert!(matches!(result, Err(SleuthError::PlanParse(_))));
    }

    #[test]
    fn test_first_pending_skips_done() {
        let mut plan = Plan::parse("- get_tables: a\n- execute_query: b", KNOWN).unwrap();
        plan.steps[0].status = StepStatus::Done;
        assert_eq!(plan.first_pending().unwrap().tool_name, "execute_query");
    }

    #[test]
    fn test_pending_tools_order() {
        let plan = Plan::parse("- get_tables: a\n- execute_query: b", KNOWN).unwrap();
        assert_eq!(plan.pending_tools(), vec!["get_tables", "execute_query"]);
        assert!(plan.has_pending("execute_query"));
        assert!(!plan.has_pending("final_answer"));
    }

    #[test]
    fn test_render_roundtrips_steps() {
        let plan = Plan::parse("- get_tables: list tables\n- final_answer: report", KNOWN).unwrap();
        let rendered = plan.render();
        let reparsed = Plan::parse(&rendered, KNOWN).unwrap();
        assert_eq!(reparsed.steps.len(), plan.steps.len());
        assert_eq!(reparsed.steps[0].tool_name, "get_tables");
    }

    #[test]
    fn test_render_marks_done_steps() {
        let mut plan = Plan::parse("- get_tables: list", KNOWN).unwrap();
        plan.steps[0].status = StepStatus::Done;
        assert!(plan.render().contains("[done]"));
    }
}
