// src/dag/plan.rs

//! Per-run prerequisite resolution.
//!
//! A [`RunPlan`] is the transitive prerequisite closure of the requested task,
//! in an order where every task comes after all of its prerequisites. It is
//! computed depth-first with a "currently visiting" marker, so unknown
//! references and cycles are reported before any action runs.

use std::collections::HashMap;

use crate::dag::graph::DagGraph;
use crate::dag::registry::{TaskDef, TaskRegistry};
use crate::errors::{Result, SitedagError};
use crate::types::TaskName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// The resolved set of tasks taking part in one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    target: TaskName,
    /// Topological order: prerequisites before dependents.
    tasks: Vec<TaskDef>,
    graph: DagGraph,
}

impl RunPlan {
    /// Resolve `target` and its transitive prerequisites against `registry`.
    pub fn resolve(registry: &TaskRegistry, target: &str) -> Result<Self> {
        let mut resolver = Resolver {
            registry,
            marks: HashMap::new(),
            path: Vec::new(),
            order: Vec::new(),
        };
        resolver.visit(target, None)?;

        let tasks: Vec<TaskDef> = resolver.order.into_iter().cloned().collect();
        let graph = DagGraph::from_defs(tasks.iter());

        Ok(Self {
            target: target.to_string(),
            tasks,
            graph,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tasks(&self) -> &[TaskDef] {
        &self.tasks
    }

    /// Names in execution-compatible order.
    pub fn order(&self) -> Vec<&str> {
        self.tasks.iter().map(|d| d.name()).collect()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

struct Resolver<'a> {
    registry: &'a TaskRegistry,
    marks: HashMap<&'a str, Mark>,
    path: Vec<&'a str>,
    order: Vec<&'a TaskDef>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, name: &str, referrer: Option<&str>) -> Result<()> {
        match self.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(self.cycle_error(name)),
            None => {}
        }

        let registry = self.registry;
        let def = registry.get(name).ok_or_else(|| {
            SitedagError::UnknownTask(match referrer {
                Some(parent) => format!("{name} (prerequisite of '{parent}')"),
                None => name.to_string(),
            })
        })?;

        self.marks.insert(def.name(), Mark::Visiting);
        self.path.push(def.name());

        for dep in def.prerequisites() {
            self.visit(dep, Some(def.name()))?;
        }

        self.path.pop();
        self.marks.insert(def.name(), Mark::Done);
        self.order.push(def);
        Ok(())
    }

    fn cycle_error(&self, name: &str) -> SitedagError {
        let start = self.path.iter().position(|n| *n == name).unwrap_or(0);
        let mut cycle: Vec<&str> = self.path[start..].to_vec();
        cycle.push(name);
        SitedagError::CyclicDependency(cycle.join(" -> "))
    }
}
