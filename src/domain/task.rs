//! Task definition
//!
//! A task is one external request: a goal plus the capability whose successful
//! dispatch ends it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_task_id;
use crate::tools::FINAL_ANSWER;

/// One external request driven to completion by the loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Free text description of the objective
    pub goal: String,
    /// Capability whose successful dispatch ends the task
    pub terminal_tool: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with the default terminal tool
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            id: generate_task_id(),
            goal: goal.into(),
            terminal_tool: FINAL_ANSWER.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new("list active datacenters");
        assert_eq!(task.goal, "list active datacenters");
        assert_eq!(task.terminal_tool, FINAL_ANSWER);
        assert!(task.id.starts_with("task-"));
    }

    #[test]
    fn test_task_serialization_roundtrip() {
        let task = Task::new("find inactive managers");
        let json = serde_json::to_string(&task).unwrap();
        let restored: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.id, restored.id);
        assert_eq!(task.goal, restored.goal);
        assert_eq!(task.terminal_tool, restored.terminal_tool);
    }
}
