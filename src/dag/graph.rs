// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::registry::TaskDef;
use crate::types::TaskName;

/// Internal node structure: stores immediate prerequisites and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Tasks that must complete before this one's action runs.
    deps: Vec<TaskName>,
    /// Tasks that list this one as a prerequisite.
    dependents: Vec<TaskName>,
}

/// Lightweight adjacency view over a set of task definitions.
///
/// Built per run from the prerequisite closure of the requested task, after
/// unknown references and cycles have already been ruled out by
/// [`RunPlan::resolve`](crate::dag::RunPlan::resolve).
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn from_defs<'a>(defs: impl IntoIterator<Item = &'a TaskDef>) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();

        // First pass: create nodes with their prerequisite lists.
        for def in defs {
            nodes.insert(
                def.name().to_string(),
                DagNode {
                    deps: def.prerequisites().to_vec(),
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: populate dependents based on deps.
        let task_names: Vec<TaskName> = nodes.keys().cloned().collect();
        for task_name in task_names {
            let deps = nodes
                .get(&task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    if !dep_node.dependents.contains(&task_name) {
                        dep_node.dependents.push(task_name.clone());
                    }
                }
            }
        }

        Self { nodes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
