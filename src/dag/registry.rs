// src/dag/registry.rs

//! Explicit task registry.
//!
//! The registry is an ordinary value owned by whoever builds it (and later by
//! the [`Runner`](crate::engine::Runner)), so tests can create as many
//! independent registries as they like.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{Result, SitedagError};
use crate::exec::TaskAction;
use crate::types::TaskName;

/// Definition of a single task: name, prerequisites and optional action.
#[derive(Clone)]
pub struct TaskDef {
    name: TaskName,
    prerequisites: Vec<TaskName>,
    action: Option<Arc<dyn TaskAction>>,
    description: Option<String>,
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDef")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskDef {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            prerequisites: Vec::new(),
            action: None,
            description: None,
        }
    }

    /// Append prerequisites, keeping declaration order.
    pub fn after<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }

    pub fn with_action(mut self, action: Arc<dyn TaskAction>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prerequisites(&self) -> &[TaskName] {
        &self.prerequisites
    }

    /// Cloned handle on the action, if any.
    pub fn action(&self) -> Option<Arc<dyn TaskAction>> {
        self.action.clone()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Name-keyed collection of task definitions.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDef>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a task.
    ///
    /// Prerequisites may name tasks that are registered later; references are
    /// only resolved when a run starts or [`validate`](Self::validate) is
    /// called. Returns the previous definition if one was replaced.
    pub fn register(
        &mut self,
        name: &str,
        prerequisites: &[&str],
        action: Option<Arc<dyn TaskAction>>,
    ) -> Option<TaskDef> {
        let mut def = TaskDef::new(name).after(prerequisites.iter().copied());
        def.action = action;
        self.insert(def)
    }

    /// Register a fully built [`TaskDef`], replacing any previous definition
    /// with the same name.
    pub fn insert(&mut self, def: TaskDef) -> Option<TaskDef> {
        debug!(
            task = %def.name,
            prerequisites = ?def.prerequisites,
            has_action = def.action.is_some(),
            "registering task"
        );
        self.tasks.insert(def.name.clone(), def)
    }

    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Eagerly check the whole registry: every prerequisite must be
    /// registered and the graph must be acyclic.
    pub fn validate(&self) -> Result<()> {
        for def in self.tasks.values() {
            for dep in &def.prerequisites {
                if !self.tasks.contains_key(dep) {
                    return Err(SitedagError::UnknownTask(format!(
                        "{dep} (prerequisite of '{}')",
                        def.name
                    )));
                }
            }
        }

        // Edge direction: prerequisite -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }
        for def in self.tasks.values() {
            for dep in &def.prerequisites {
                graph.add_edge(dep.as_str(), def.name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(SitedagError::CyclicDependency(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
