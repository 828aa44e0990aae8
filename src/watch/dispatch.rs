// src/watch/dispatch.rs

//! Fire-and-forget execution of watch triggers.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::Runner;
use crate::watch::event_handler::WatchTrigger;

/// Consume triggers and start one independent background job per trigger.
///
/// Jobs are never awaited by the loop, so a slow or hung run does not hold up
/// later events and overlapping triggers produce overlapping runs.
pub fn spawn_dispatcher(runner: Runner, mut trigger_rx: mpsc::Receiver<WatchTrigger>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(trigger) = trigger_rx.recv().await {
            dispatch_trigger(runner.clone(), trigger);
        }
        debug!("watch dispatcher finished");
    })
}

/// Run the trigger's tasks in sequence on a background tokio task.
///
/// A failing run is logged and ends the sequence for this trigger only.
pub fn dispatch_trigger(runner: Runner, trigger: WatchTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        match runner.run_sequence(&trigger.tasks).await {
            Ok(reports) => info!(
                glob = %trigger.glob,
                path = %trigger.path,
                tasks = ?trigger.tasks,
                elapsed_ms = reports.iter().map(|r| r.elapsed.as_millis() as u64).sum::<u64>(),
                "watch-triggered tasks finished"
            ),
            Err(err) => error!(
                glob = %trigger.glob,
                path = %trigger.path,
                tasks = ?trigger.tasks,
                error = %err,
                "watch-triggered run failed"
            ),
        }
    })
}
