// src/engine/runner.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::dag::{RunPlan, ScheduledTask, Scheduler, TaskRegistry};
use crate::errors::{Result, SitedagError};
use crate::exec::{ActionExecutor, DispatchContext, ExecutorBackend};
use crate::types::TaskName;

use super::{RunEvent, RunHandle, RunReport};

/// Executes tasks by name against an owned [`TaskRegistry`].
///
/// Cloning is cheap; all clones share the registry, the executor and the run
/// counter. Every call to [`run`](Self::run) is an independent run with its
/// own memoization, so concurrent runs never coalesce.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    registry: TaskRegistry,
    executor: Box<dyn ExecutorBackend>,
    run_counter: AtomicU64,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("tasks", &self.inner.registry.len())
            .field("runs", &self.inner.run_counter.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Runner using the production [`ActionExecutor`].
    pub fn new(registry: TaskRegistry) -> Self {
        Self::with_executor(registry, ActionExecutor::new())
    }

    /// Runner with a custom executor backend (e.g. a fake in tests).
    pub fn with_executor(registry: TaskRegistry, executor: impl ExecutorBackend + 'static) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                registry,
                executor: Box::new(executor),
                run_counter: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// Run `task` after all of its transitive prerequisites.
    ///
    /// - `UnknownTask` / `CyclicDependency` are returned before any action
    ///   starts.
    /// - The first failing action aborts the run; the error is returned as
    ///   `ActionFailure` once the actions already in flight have finished.
    pub async fn run(&self, task: &str) -> Result<RunReport> {
        let plan = RunPlan::resolve(&self.inner.registry, task)?;
        let run_id = self.inner.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let mut scheduler = Scheduler::from_plan(&plan, run_id);

        // Each task reports exactly one completion, so a channel as large as
        // the plan never blocks a sender while we are busy dispatching.
        let (event_tx, mut event_rx) = mpsc::channel::<RunEvent>(plan.len().max(1));

        let ready = scheduler.start();
        self.dispatch(ready, &event_tx).await?;

        while !scheduler.is_finished() {
            let Some(event) = event_rx.recv().await else {
                // Unreachable while we hold `event_tx`, but don't spin.
                return Err(SitedagError::Other(anyhow::anyhow!(
                    "event channel closed during run {run_id}"
                )));
            };

            debug!(?event, run_id, "run received event");

            match event {
                RunEvent::TaskCompleted {
                    task,
                    outcome,
                    elapsed,
                } => {
                    let ready = scheduler.handle_completion(&task, outcome, elapsed);
                    self.dispatch(ready, &event_tx).await?;
                }
            }
        }

        let elapsed = started.elapsed();
        let target = scheduler.target().to_string();
        let (completed, failure) = scheduler.into_parts();

        match failure {
            Some((failed_task, message)) => {
                error!(
                    run_id,
                    target = %target,
                    failed_task = %failed_task,
                    error = %message,
                    "run failed"
                );
                Err(SitedagError::ActionFailure {
                    task: failed_task,
                    message,
                })
            }
            None => {
                info!(
                    run_id,
                    target = %target,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run finished"
                );
                Ok(RunReport {
                    run_id,
                    target,
                    completed,
                    elapsed,
                })
            }
        }
    }

    /// Run each task in order as separate runs, stopping at the first error.
    pub async fn run_sequence(&self, tasks: &[TaskName]) -> Result<Vec<RunReport>> {
        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            reports.push(self.run(task).await?);
        }
        Ok(reports)
    }

    /// Start a run in the background and return a handle that resolves when
    /// the run (including all prerequisites) has finished.
    pub fn spawn(&self, task: impl Into<TaskName>) -> RunHandle {
        let task = task.into();
        let (done_tx, done_rx) = oneshot::channel();
        let runner = self.clone();
        let name = task.clone();

        tokio::spawn(async move {
            let result = runner.run(&name).await;
            // The handle may have been dropped (fire-and-forget).
            let _ = done_tx.send(result);
        });

        RunHandle::new(task, done_rx)
    }

    async fn dispatch(
        &self,
        tasks: Vec<ScheduledTask>,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tasks");

        let ctx = DispatchContext {
            runner: self.clone(),
            events: events.clone(),
        };
        self.inner.executor.spawn_ready_tasks(tasks, ctx).await
    }
}
