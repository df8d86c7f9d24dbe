//! Loop controller - orchestrates the full task-solving cycle
//!
//! One cycle runs plan -> decide -> describe -> execute -> replan. Errors from
//! collaborators are informative input to the next plan, never immediately
//! fatal; the loop terminates only on a successful terminal dispatch or an
//! exhausted budget. Each full cycle appends exactly one trace entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::decider::Decider;
use crate::agent::describer::Describer;
use crate::agent::dispatcher::ToolDispatcher;
use crate::agent::plan_store::PlanStore;
use crate::agent::planner::Planner;
use crate::agent::trace_log::TraceLogger;
use crate::domain::{Action, Plan, Task, Trace, TraceEntry};
use crate::error::{Result, SleuthError};
use crate::tools::ToolRegistry;

/// Loop states, entered in cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Planning,
    Deciding,
    Describing,
    Executing,
    Replanning,
    Terminated,
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum number of cycles before the task is declared exhausted
    pub max_cycles: u32,
    /// Optional wall-clock deadline, checked between cycles
    pub deadline: Option<Duration>,
    /// Ask the reasoning component for a reflection after each execution
    pub reflect: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            deadline: None,
            reflect: false,
        }
    }
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The terminal tool was dispatched successfully
    Completed { answer: Vec<String> },
    /// Iteration or time budget ran out before a terminal dispatch
    Exhausted,
    /// A controller-level invariant was violated
    Fatal { reason: String },
}

/// Final report: outcome plus the full trace and plan history for diagnostics
#[derive(Debug)]
pub struct TaskReport {
    pub task: Task,
    pub outcome: TaskOutcome,
    pub trace: Trace,
    pub plans: Vec<Plan>,
    pub cycles: u32,
}

pub struct LoopController {
    registry: Arc<ToolRegistry>,
    planner: Planner,
    decider: Decider,
    describer: Describer,
    dispatcher: ToolDispatcher,
    config: ControllerConfig,
    trace_logger: Option<TraceLogger>,
}

impl LoopController {
    pub fn new(
        registry: Arc<ToolRegistry>,
        planner: Planner,
        decider: Decider,
        describer: Describer,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            registry,
            planner,
            decider,
            describer,
            dispatcher,
            config: ControllerConfig::default(),
            trace_logger: None,
        }
    }

    /// Set the controller configuration
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a markdown trace logger
    pub fn with_trace_logger(mut self, logger: TraceLogger) -> Self {
        self.trace_logger = Some(logger);
        self
    }

    /// Drive the task to completion, exhaustion, or a fatal outcome
    ///
    /// The report always carries the last known trace and plan history.
    pub async fn run(&self, task: &Task) -> TaskReport {
        let mut store = PlanStore::new();
        let mut trace = Trace::new();
        let mut cycles = 0u32;

        let outcome = match self
            .run_inner(task, &mut store, &mut trace, &mut cycles)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(task_id = %task.id, error = %e, "Task aborted");
                TaskOutcome::Fatal {
                    reason: e.to_string(),
                }
            }
        };

        tracing::info!(task_id = %task.id, cycles, outcome = ?outcome_kind(&outcome), "Task finished");
        TaskReport {
            task: task.clone(),
            outcome,
            trace,
            plans: store.into_history(),
            cycles,
        }
    }

    async fn run_inner(
        &self,
        task: &Task,
        store: &mut PlanStore,
        trace: &mut Trace,
        cycles: &mut u32,
    ) -> Result<TaskOutcome> {
        let started = Instant::now();
        let mut state = LoopState::Planning;
        tracing::debug!(state = ?state, task_id = %task.id, "Seeding plan");

        let seed = self.planner.seed(task, trace).await?;
        self.log_plan(&seed);
        store.push(seed);

        let mut consecutive_schema_violations = 0u32;

        loop {
            if *cycles >= self.config.max_cycles {
                tracing::warn!(task_id = %task.id, cycles = *cycles, "Cycle budget exhausted");
                return Ok(TaskOutcome::Exhausted);
            }
            if let Some(deadline) = self.config.deadline
                && started.elapsed() >= deadline
            {
                tracing::warn!(task_id = %task.id, "Deadline exceeded");
                return Ok(TaskOutcome::Exhausted);
            }
            *cycles += 1;

            let plan = store
                .current()
                .cloned()
                .ok_or_else(|| SleuthError::PlanParse("plan store is empty".to_string()))?;

            state = LoopState::Deciding;
            tracing::debug!(state = ?state, cycle = *cycles, "Selecting next tool");
            let selection = self.decider.select(&plan, trace).await?;

            state = LoopState::Describing;
            tracing::debug!(state = ?state, tool = %selection.tool_name, "Building arguments");
            let descriptor = self.registry.describe(&selection.tool_name)?;
            let arguments = match self
                .describer
                .build_arguments(descriptor, task, &plan, trace)
                .await
            {
                Ok(arguments) => arguments,
                Err(SleuthError::ArgumentConstruction(detail)) => {
                    tracing::warn!(
                        tool = %selection.tool_name,
                        detail = %detail,
                        "Missing precondition; forcing plan revision"
                    );
                    state = LoopState::Replanning;
                    tracing::debug!(state = ?state, cycle = *cycles, "Revising plan");
                    let revised = self.planner.revise(task, &plan, trace).await?;
                    self.log_plan(&revised);
                    store.push(revised);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let action = Action::new(selection.tool_name, selection.rationale, arguments);

            state = LoopState::Executing;
            tracing::debug!(state = ?state, tool = %action.tool_name, "Dispatching");
            self.log_action(&action);
            let result = self.dispatcher.invoke(&action).await?;
            self.log_result(&result);

            let reflection = if self.config.reflect {
                match self.planner.reflect(task, &action, &result).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(error = %e, "Reflection failed; continuing without it");
                        None
                    }
                }
            } else {
                None
            };

            trace.push(TraceEntry::new(
                plan.clone(),
                action.clone(),
                result.clone(),
                reflection,
            ));

            if result.is_schema_violation() {
                consecutive_schema_violations += 1;
                if consecutive_schema_violations > 1 {
                    return Err(SleuthError::SchemaViolation(
                        result.error_detail.clone().unwrap_or_default(),
                    ));
                }
            } else {
                consecutive_schema_violations = 0;
            }

            if action.tool_name == task.terminal_tool && result.is_ok() {
                state = LoopState::Terminated;
                tracing::debug!(state = ?state, "Terminal tool succeeded");
                return Ok(TaskOutcome::Completed {
                    answer: answer_from(&action),
                });
            }

            state = LoopState::Replanning;
            tracing::debug!(state = ?state, cycle = *cycles, "Revising plan");
            let revised = self.planner.revise(task, &plan, trace).await?;
            self.log_plan(&revised);
            store.push(revised);
        }
    }

    fn log_plan(&self, plan: &Plan) {
        if let Some(logger) = &self.trace_logger {
            logger.log_plan(plan);
        }
    }

    fn log_action(&self, action: &Action) {
        if let Some(logger) = &self.trace_logger {
            logger.log_action(action);
        }
    }

    fn log_result(&self, result: &crate::domain::ExecutionResult) {
        if let Some(logger) = &self.trace_logger {
            logger.log_result(result);
        }
    }
}

/// The answer values submitted with the terminal action
fn answer_from(action: &Action) -> Vec<String> {
    action.arguments["answer"]
        .as_array()
        .map(|values| {
            values
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn outcome_kind(outcome: &TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Completed { .. } => "completed",
        TaskOutcome::Exhausted => "exhausted",
        TaskOutcome::Fatal { .. } => "fatal",
    }
}
