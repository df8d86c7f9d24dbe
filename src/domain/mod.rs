//! Domain types for the agent loop
//!
//! Plans, actions, execution results, traces, and tasks. These are the values
//! the control loop produces and conditions on; all of them are plain data.

pub mod action;
pub mod plan;
pub mod task;
pub mod trace;

pub use action::{Action, ExecStatus, ExecutionResult, SCHEMA_VIOLATION_PREFIX};
pub use plan::{Plan, PlanStep, StepStatus};
pub use task::Task;
pub use trace::{Trace, TraceEntry};
