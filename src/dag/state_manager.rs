// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::dag::DagGraph;
use crate::types::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    /// Topological order of the run, used to keep dispatch deterministic.
    order: &'a [TaskName],
    run_id: u64,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        order: &'a [TaskName],
        run_id: u64,
    ) -> Self {
        Self {
            graph,
            tasks,
            order,
            run_id,
        }
    }

    /// Whether every prerequisite of `info` has succeeded in this run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every pending dependent (transitively) of a failed task as
    /// `DoneFailed`.
    ///
    /// Returns the newly failed tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut visited: HashSet<TaskName> = HashSet::new();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == RunState::Pending {
                    info.run_state = RunState::DoneFailed;
                    debug!(
                        task = %info.name,
                        run_id = self.run_id,
                        upstream = %failed_task,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    newly_failed.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            } else {
                warn!(task = %name, "node in run graph not present in tasks map");
            }
        }

        newly_failed
    }

    /// Abort the run: every task still `Pending` becomes `Skipped`.
    pub fn skip_pending(&mut self) -> Vec<TaskName> {
        let mut skipped = Vec::new();
        for name in self.order {
            if let Some(info) = self.tasks.get_mut(name) {
                if info.run_state == RunState::Pending {
                    info.run_state = RunState::Skipped;
                    skipped.push(info.name.clone());
                }
            }
        }
        if !skipped.is_empty() {
            debug!(run_id = self.run_id, ?skipped, "run aborted; skipping pending tasks");
        }
        skipped
    }

    /// Collect `Pending` tasks whose prerequisites are satisfied, mark them
    /// `Running`, and return them as `ScheduledTask`s in topological order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskName> = self
            .order
            .iter()
            .filter(|name| {
                self.tasks.get(*name).is_some_and(|info| {
                    info.run_state == RunState::Pending && self.deps_satisfied_for_info(info)
                })
            })
            .cloned()
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                debug!(
                    task = %info.name,
                    run_id = self.run_id,
                    has_action = info.action.is_some(),
                    "prerequisites satisfied; marking Running"
                );
                info.run_state = RunState::Running;
                ready.push(ScheduledTask::from_task_info(info, self.run_id));
            }
        }

        ready
    }
}

/// A read-only view for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state == RunState::DoneSuccess,
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "prerequisite missing from run; treating as unsatisfied"
                );
                false
            }
        })
    }
}
