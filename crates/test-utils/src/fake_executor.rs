use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitedag::dag::ScheduledTask;
use sitedag::engine::{RunEvent, TaskOutcome};
use sitedag::errors::Result;
use sitedag::exec::{DispatchContext, ExecutorBackend};

/// A fake executor that:
/// - records which tasks were dispatched, in order
/// - never runs actions
/// - immediately reports `TaskCompleted` (success, or failure for tasks
///   registered with [`failing`](Self::failing)).
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report these tasks as failed.
    pub fn failing(tasks: &[&str]) -> Self {
        Self {
            executed: Arc::default(),
            failing: Arc::new(tasks.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &self,
        tasks: Vec<ScheduledTask>,
        ctx: DispatchContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in tasks {
                self.executed.lock().unwrap().push(t.name.clone());

                let outcome = if self.failing.contains(&t.name) {
                    TaskOutcome::Failed(format!("{} failed (fake)", t.name))
                } else {
                    TaskOutcome::Success
                };

                ctx.events
                    .send(RunEvent::TaskCompleted {
                        task: t.name.clone(),
                        outcome,
                        elapsed: Duration::ZERO,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
