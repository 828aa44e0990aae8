// src/dag/mod.rs

//! Task graph representation and per-run scheduling.
//!
//! - [`registry`] holds the explicit, name-keyed task registry.
//! - [`plan`] resolves the prerequisite closure of a requested task.
//! - [`graph`] is the adjacency view (prerequisites / dependents) of a plan.
//! - [`scheduler`] is the per-run state machine that decides which tasks are
//!   ready, and what happens when one fails.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod plan;
pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use plan::RunPlan;
pub use registry::{TaskDef, TaskRegistry};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
