//! The agent loop
//!
//! Components that drive one task to completion: the planner and plan store,
//! the decider and describer, the dispatcher, and the controller that runs
//! the plan -> decide -> describe -> execute -> replan cycle.

pub mod controller;
pub mod decider;
pub mod describer;
pub mod dispatcher;
pub mod plan_store;
pub mod planner;
pub mod trace_log;

pub use controller::{ControllerConfig, LoopController, LoopState, TaskOutcome, TaskReport};
pub use decider::{Decider, Selection};
pub use describer::Describer;
pub use dispatcher::ToolDispatcher;
pub use plan_store::PlanStore;
pub use planner::Planner;
pub use trace_log::TraceLogger;
