// src/engine/mod.rs

//! Run orchestration.
//!
//! The pure per-run state machine lives in [`crate::dag::Scheduler`]; this
//! module is the async shell around it:
//! - [`runner`] resolves a plan, dispatches ready tasks to an executor and
//!   feeds completion events back into the scheduler until the run is done.
//! - [`handle`] wraps a spawned run in an explicit completion notification.

use std::time::Duration;

pub use crate::types::TaskName;

/// Outcome of a task's action for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The action reported an error (message rendered with its context chain).
    Failed(String),
}

/// Events flowing from the executor back into a run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
        elapsed: Duration,
    },
}

/// A task that completed successfully within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTask {
    pub name: TaskName,
    pub elapsed: Duration,
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: u64,
    pub target: TaskName,
    /// Every task of the run, in completion order.
    pub completed: Vec<CompletedTask>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Names of the executed tasks, in completion order.
    pub fn executed(&self) -> Vec<&str> {
        self.completed.iter().map(|t| t.name.as_str()).collect()
    }
}

pub mod handle;
pub mod runner;

pub use handle::RunHandle;
pub use runner::Runner;
