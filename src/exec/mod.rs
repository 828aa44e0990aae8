// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`action`] defines the `TaskAction` trait that a task's work implements.
//! - [`task_runner`] runs one action and reports its outcome to the run.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `ActionExecutor` that the runner uses in production, and which tests
//!   can replace with a fake implementation.

pub mod action;
pub mod backend;
pub mod task_runner;

pub use action::{ActionFuture, FnAction, TaskAction, TaskContext, action_fn};
pub use backend::{ActionExecutor, DispatchContext, ExecutorBackend};
