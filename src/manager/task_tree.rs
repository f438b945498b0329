use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::{debug, warn};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::models::status::Status;
use crate::progress::Progress;
use crate::task::base::{Job, TaskBase};
use crate::task::control::TaskControl;
use crate::task::error::TaskError;
use crate::task::{lock, Task, TaskId};

/// Dependency graph; edges point from a parent to the task that needs it.
#[derive(Default)]
struct Graph {
    graph: DiGraph<Arc<dyn Task>, ()>,
    nodes: HashMap<TaskId, NodeIndex>,
}

impl Graph {
    fn node(&mut self, task: &Arc<dyn Task>) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&task.id()) {
            return index;
        }
        let index = self.graph.add_node(Arc::clone(task));
        self.nodes.insert(task.id(), index);
        index
    }

    /// Every task with its parents, parents first.
    fn schedule(&self) -> Result<Vec<(Arc<dyn Task>, Vec<Arc<dyn Task>>)>, TaskError> {
        let order = algo::toposort(&self.graph, None)
            .map_err(|cycle| TaskError::DependencyCycle(self.graph[cycle.node_id()].id()))?;

        Ok(order
            .into_iter()
            .map(|index| {
                let parents = self
                    .graph
                    .neighbors_directed(index, Direction::Incoming)
                    .map(|parent| Arc::clone(&self.graph[parent]))
                    .collect();
                (Arc::clone(&self.graph[index]), parents)
            })
            .collect())
    }
}

#[derive(Default)]
pub struct Dag {
    graph: Mutex<Graph>,
}

/// Runs its tasks one at a time so that every task runs after all of its
/// parents.
///
/// A task whose parent did not finalize is skipped, and so are its own
/// dependents. A dependency cycle fails the whole tree before anything runs.
pub type TaskTree = TaskBase<Dag>;

impl Dag {
    fn tasks(&self) -> Vec<Arc<dyn Task>> {
        lock(&self.graph).graph.node_weights().cloned().collect()
    }
}

impl Job for Dag {
    fn execute(&self, task: &TaskControl, progress: Option<&dyn Progress>) -> Result<(), TaskError> {
        let schedule = lock(&self.graph).schedule()?;

        for (child, parents) in schedule {
            if !task.checkpoint() {
                debug!("Task tree '{}' stopped before task '{}'.", task.id(), child.id());
                return Ok(());
            }

            if let Some(parent) = parents.iter().find(|parent| parent.status() != Status::Finalized) {
                warn!(
                    "Task tree '{}' skipping task '{}': dependency '{}' is {}.",
                    task.id(),
                    child.id(),
                    parent.id(),
                    parent.status()
                );
                continue;
            }

            child.run(None);

            if let Some(progress) = progress {
                progress.tick();
            }
        }
        Ok(())
    }

    fn on_stop(&self) {
        for child in self.tasks() {
            child.stop();
        }
    }
}

impl TaskTree {
    pub fn new() -> Arc<Self> {
        TaskBase::from_job(Dag::default())
    }

    /// Adds `task` so that it runs after every task in `parents`. Parents that
    /// are not in the tree yet are added without dependencies of their own.
    pub fn add_task(&self, task: Arc<dyn Task>, parents: &[Arc<dyn Task>]) {
        let mut graph = lock(&self.job().graph);
        let child = graph.node(&task);
        for parent in parents {
            let parent = graph.node(parent);
            graph.graph.update_edge(parent, child, ());
        }
    }

    pub fn size(&self) -> usize {
        lock(&self.job().graph).graph.node_count()
    }

    pub fn empty(&self) -> bool {
        self.size() == 0
    }

    pub fn tasks(&self) -> Vec<Arc<dyn Task>> {
        self.job().tasks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::base::from_fn;

    fn noop() -> Arc<dyn Task> {
        from_fn(|_, _| Ok(()))
    }

    #[test]
    fn parents_are_added_implicitly_once() {
        let tree = TaskTree::new();
        let root = noop();
        let a = noop();
        let b = noop();
        tree.add_task(a.clone(), &[root.clone()]);
        tree.add_task(b.clone(), &[root.clone(), a.clone()]);
        tree.add_task(b.clone(), &[a.clone()]);

        assert_eq!(tree.size(), 3);
        let graph = lock(&tree.job().graph);
        assert_eq!(graph.graph.edge_count(), 3);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tree = TaskTree::new();
        let a = noop();
        tree.add_task(a.clone(), &[a.clone()]);

        let err = lock(&tree.job().graph).schedule().err();
        assert!(matches!(err, Some(TaskError::DependencyCycle(id)) if id == a.id()));
    }
}
