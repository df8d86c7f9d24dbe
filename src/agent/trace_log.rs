//! Markdown trace log
//!
//! Appends plan, action, and result sections to a markdown file as the loop
//! runs. Pure diagnostics: write failures are logged and swallowed so they
//! can never affect control flow.

use std::io::Write;
use std::path::PathBuf;

use crate::domain::{Action, ExecutionResult, Plan};

pub struct TraceLogger {
    path: PathBuf,
}

impl TraceLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record a plan revision
    pub fn log_plan(&self, plan: &Plan) {
        self.append(&format!(
            "# Planning (revision {})\n{}\n",
            plan.revision,
            plan.render()
        ));
    }

    /// Record a dispatched action
    pub fn log_action(&self, action: &Action) {
        self.append(&format!(
            "## Action: {}\n{}\n```json\n{}\n```\n",
            action.tool_name, action.rationale, action.arguments
        ));
    }

    /// Record an execution result
    pub fn log_result(&self, result: &ExecutionResult) {
        let body = if result.is_ok() {
            result.payload.to_string()
        } else {
            format!(
                "ERROR: {}",
                result.error_detail.as_deref().unwrap_or("unknown")
            )
        };
        self.append(&format!("### Execution\n```\n{}\n```\n", body));
    }

    fn append(&self, content: &str) {
        let opened = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path);

        let write_result = opened.and_then(|mut file| file.write_all(content.as_bytes()));
        if let Err(e) = write_result {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write trace log");
        }
    }
}
