// src/exec/action.rs

//! The unit of work a task performs.
//!
//! Actions are asynchronous and may perform arbitrary I/O. They report
//! failure through `anyhow::Error`; the runner turns that into
//! `SitedagError::ActionFailure` for the run.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::Runner;
use crate::types::TaskName;

/// Boxed future returned by [`TaskAction::execute`].
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// What an action gets to see about the run it belongs to.
#[derive(Clone)]
pub struct TaskContext {
    pub task: TaskName,
    pub run_id: u64,
    /// Handle on the runner that executes this run. Actions that need to
    /// start further runs (e.g. watch bindings) go through it.
    pub runner: Runner,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// A task's own work, as opposed to its prerequisite declarations.
pub trait TaskAction: Send + Sync {
    fn execute(&self, ctx: TaskContext) -> ActionFuture<'_>;
}

/// Adapter turning an async closure into a [`TaskAction`].
pub struct FnAction<F> {
    f: F,
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn execute(&self, ctx: TaskContext) -> ActionFuture<'_> {
        Box::pin((self.f)(ctx))
    }
}

/// Wrap an async closure as a shareable action.
///
/// ```ignore
/// registry.register("hello", &[], Some(action_fn(|_ctx| async {
///     println!("hello");
///     Ok(())
/// })));
/// ```
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn TaskAction>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnAction { f })
}
