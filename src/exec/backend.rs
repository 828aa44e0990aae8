// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runner talks to an `ExecutorBackend` instead of spawning actions
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production executor in [`ActionExecutor`].
//!
//! - `ActionExecutor` spawns every ready task's action on the tokio runtime
//!   and reports back through the run's event channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::{RunEvent, Runner, TaskOutcome};
use crate::errors::Result;

use super::action::TaskContext;
use super::task_runner::run_action;

/// Per-dispatch wiring handed to the backend by the runner.
#[derive(Clone)]
pub struct DispatchContext {
    /// The runner that owns the run, passed on to actions.
    pub runner: Runner,
    /// Completion events for the run being dispatched.
    pub events: mpsc::Sender<RunEvent>,
}

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send + Sync {
    /// Dispatch the given tasks for execution.
    ///
    /// Exactly one `RunEvent::TaskCompleted` must eventually be sent on
    /// `ctx.events` for every task passed in.
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        ctx: DispatchContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production executor: runs each action concurrently on tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutorBackend for ActionExecutor {
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        ctx: DispatchContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                let Some(action) = task.action.clone() else {
                    // Grouping task: nothing to run beyond its prerequisites.
                    debug!(task = %task.name, run_id = task.run_id, "task has no action");
                    ctx.events
                        .send(RunEvent::TaskCompleted {
                            task: task.name.clone(),
                            outcome: TaskOutcome::Success,
                            elapsed: Duration::ZERO,
                        })
                        .await
                        .with_context(|| {
                            format!("reporting completion of task '{}'", task.name)
                        })?;
                    continue;
                };

                let task_ctx = TaskContext {
                    task: task.name.clone(),
                    run_id: task.run_id,
                    runner: ctx.runner.clone(),
                };
                tokio::spawn(run_action(task_ctx, action, ctx.events.clone()));
            }
            Ok(())
        })
    }
}
