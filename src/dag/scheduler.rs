use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::plan::RunPlan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{CompletedTask, TaskOutcome};
use crate::types::TaskName;

/// Per-run state machine over a resolved [`RunPlan`].
///
/// It is responsible for:
/// - deciding when a task is "ready" (all prerequisites succeeded)
/// - marking tasks as succeeded/failed
/// - scheduling dependents when appropriate
/// - failing dependents and aborting the rest of the run when a task fails
///
/// It is synchronous and performs no IO; the async shell lives in
/// [`Runner`](crate::engine::Runner).
#[derive(Debug)]
pub struct Scheduler {
    run_id: u64,
    target: TaskName,
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    order: Vec<TaskName>,
    started: bool,
    /// Tasks that completed successfully, in completion order.
    completed: Vec<CompletedTask>,
    /// First failure observed in this run.
    failure: Option<(TaskName, String)>,
}

impl Scheduler {
    pub fn from_plan(plan: &RunPlan, run_id: u64) -> Self {
        let tasks = plan
            .tasks()
            .iter()
            .map(|def| (def.name().to_string(), TaskInfo::from_def(def)))
            .collect();
        let order = plan.order().into_iter().map(str::to_string).collect();

        Self {
            run_id,
            target: plan.target().to_string(),
            graph: plan.graph().clone(),
            tasks,
            order,
            started: false,
            completed: Vec::new(),
            failure: None,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// True once every task of the run is terminal.
    pub fn is_finished(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.tasks.get(task).map(|info| info.run_state).into()
    }

    /// Whether the prerequisites of `task` are satisfied in this run.
    ///
    /// Returns `None` if the task is not part of the run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    pub fn completed(&self) -> &[CompletedTask] {
        &self.completed
    }

    pub fn failure(&self) -> Option<(&str, &str)> {
        self.failure
            .as_ref()
            .map(|(task, msg)| (task.as_str(), msg.as_str()))
    }

    /// Consume the scheduler, returning the completed tasks and the first
    /// failure (if any).
    pub fn into_parts(self) -> (Vec<CompletedTask>, Option<(TaskName, String)>) {
        (self.completed, self.failure)
    }

    /// Dispatch the leaves of the run. Calling it twice returns nothing the
    /// second time.
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        if self.started {
            warn!(run_id = self.run_id, "scheduler already started; ignoring");
            return Vec::new();
        }
        self.started = true;

        info!(
            run_id = self.run_id,
            target = %self.target,
            tasks = self.order.len(),
            "starting run"
        );

        self.manager().collect_new_ready_tasks()
    }

    /// Handle completion of a task (production API).
    pub fn handle_completion(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome, elapsed)
            .newly_scheduled
    }

    /// Manual-step variant of `handle_completion` that returns a rich [`SchedulerStep`].
    pub fn step_completion(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> SchedulerStep {
        self.completion_step_internal(task, outcome, elapsed)
    }

    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&self.graph, &mut self.tasks, &self.order, self.run_id)
    }

    fn completion_step_internal(
        &mut self,
        task: &str,
        outcome: TaskOutcome,
        elapsed: Duration,
    ) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        let was_finished = self.is_finished();
        let run_id = self.run_id;

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, run_id, "completion for task outside this run; ignoring");
            return step;
        };

        if info.run_state != RunState::Running {
            warn!(
                task = %task,
                run_id,
                state = ?info.run_state,
                "completion for task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = RunState::DoneSuccess;
                debug!(task = %task, run_id, "task completed successfully");
                self.completed.push(CompletedTask {
                    name: task.to_string(),
                    elapsed,
                });
                step.newly_scheduled = self.manager().collect_new_ready_tasks();
            }
            TaskOutcome::Failed(message) => {
                info.run_state = RunState::DoneFailed;
                warn!(
                    task = %task,
                    run_id,
                    error = %message,
                    "task failed; failing dependents and aborting run"
                );
                step.newly_failed.push(task.to_string());
                if self.failure.is_none() {
                    self.failure = Some((task.to_string(), message));
                }

                let mut manager = self.manager();
                step.newly_failed.extend(manager.mark_dependents_failed(task));
                step.newly_skipped = manager.skip_pending();
            }
        }

        step.run_just_finished = !was_finished && self.is_finished();
        if step.run_just_finished {
            debug!(run_id, target = %self.target, "all tasks terminal; run finished");
        }
        step
    }
}
