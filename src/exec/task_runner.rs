// src/exec/task_runner.rs

//! Individual action runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RunEvent, TaskOutcome};

use super::action::{TaskAction, TaskContext};

/// Run a single task's action and emit exactly one `TaskCompleted` event.
///
/// The action runs in its own tokio task so that a panic inside it is
/// reported as a failure of that task instead of tearing down the run.
pub async fn run_action(
    ctx: TaskContext,
    action: Arc<dyn TaskAction>,
    events: mpsc::Sender<RunEvent>,
) {
    let task = ctx.task.clone();
    let run_id = ctx.run_id;
    let started = Instant::now();

    info!(task = %task, run_id, "starting task");

    let joined = tokio::spawn(async move { action.execute(ctx).await }).await;

    let outcome = match joined {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(err)) => TaskOutcome::Failed(format!("{err:#}")),
        Err(join_err) if join_err.is_panic() => {
            TaskOutcome::Failed("action panicked".to_string())
        }
        Err(join_err) => TaskOutcome::Failed(format!("action was cancelled: {join_err}")),
    };
    let elapsed = started.elapsed();

    match &outcome {
        TaskOutcome::Success => info!(
            task = %task,
            run_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "task finished"
        ),
        TaskOutcome::Failed(message) => error!(
            task = %task,
            run_id,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %message,
            "task failed"
        ),
    }

    if events
        .send(RunEvent::TaskCompleted {
            task: task.clone(),
            outcome,
            elapsed,
        })
        .await
        .is_err()
    {
        warn!(task = %task, run_id, "run is gone; dropping task completion");
    }
}
