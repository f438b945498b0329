use std::sync::{Arc, Mutex};

use log::debug;

use crate::progress::Progress;
use crate::task::base::{Job, TaskBase};
use crate::task::control::TaskControl;
use crate::task::error::TaskError;
use crate::task::{lock, Task};

#[derive(Default)]
pub struct Sequence {
    tasks: Mutex<Vec<Arc<dyn Task>>>,
}

/// Runs its tasks one after another, in insertion order.
///
/// Stopping the list stops every task in it and skips the ones that have not
/// started yet.
pub type TaskList = TaskBase<Sequence>;

impl Sequence {
    fn snapshot(&self) -> Vec<Arc<dyn Task>> {
        lock(&self.tasks).clone()
    }
}

impl Job for Sequence {
    fn execute(&self, task: &TaskControl, progress: Option<&dyn Progress>) -> Result<(), TaskError> {
        for child in self.snapshot() {
            if !task.checkpoint() {
                debug!("Task list '{}' stopped before task '{}'.", task.id(), child.id());
                return Ok(());
            }

            child.run(None);

            if let Some(progress) = progress {
                progress.tick();
            }
        }
        Ok(())
    }

    fn on_stop(&self) {
        for child in self.snapshot() {
            child.stop();
        }
    }
}

impl TaskList {
    pub fn new() -> Arc<Self> {
        TaskBase::from_job(Sequence::default())
    }

    pub fn with_tasks<I>(tasks: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        TaskBase::from_job(Sequence {
            tasks: Mutex::new(tasks.into_iter().collect()),
        })
    }

    pub fn push_back(&self, task: Arc<dyn Task>) {
        lock(&self.job().tasks).push(task);
    }

    pub fn size(&self) -> usize {
        lock(&self.job().tasks).len()
    }

    pub fn empty(&self) -> bool {
        lock(&self.job().tasks).is_empty()
    }

    pub fn tasks(&self) -> Vec<Arc<dyn Task>> {
        self.job().snapshot()
    }
}
