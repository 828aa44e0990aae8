// src/engine/handle.rs

use tokio::sync::oneshot;

use crate::errors::{Result, SitedagError};
use crate::types::TaskName;

use super::RunReport;

/// Completion notification for a run started with
/// [`Runner::spawn`](super::Runner::spawn).
///
/// Resolves once the requested task and all of its prerequisites have
/// finished. Dropping the handle does not cancel the run.
#[derive(Debug)]
pub struct RunHandle {
    task: TaskName,
    done_rx: oneshot::Receiver<Result<RunReport>>,
}

impl RunHandle {
    pub(crate) fn new(task: TaskName, done_rx: oneshot::Receiver<Result<RunReport>>) -> Self {
        Self { task, done_rx }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<RunReport> {
        let RunHandle { task, done_rx } = self;
        done_rx.await.map_err(|_| {
            SitedagError::Other(anyhow::anyhow!(
                "run of '{task}' ended without reporting a result"
            ))
        })?
    }
}
