use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use log::debug;

use crate::progress::Progress;
use crate::task::base::{Job, TaskBase};
use crate::task::control::TaskControl;
use crate::task::error::TaskError;
use crate::task::{lock, Task};

#[derive(Default)]
pub struct Fifo {
    queue: Mutex<VecDeque<Arc<dyn Task>>>,
    // Held while a queued task runs; one per queue.
    run_lock: Mutex<()>,
    current: Mutex<Option<Arc<dyn Task>>>,
}

/// Drains its tasks first-in first-out on the worker thread.
///
/// Pushing onto a finished queue makes it runnable again without losing its
/// subscriptions. Once stopped, the remaining tasks are discarded unrun.
pub type TaskQueue = TaskBase<Fifo>;

impl Fifo {
    fn front(&self) -> Option<Arc<dyn Task>> {
        lock(&self.queue).front().cloned()
    }

    fn remove(&self, task: &Arc<dyn Task>) {
        let mut queue = lock(&self.queue);
        if queue.front().is_some_and(|front| Arc::ptr_eq(front, task)) {
            queue.pop_front();
        }
    }
}

impl Job for Fifo {
    fn execute(&self, task: &TaskControl, progress: Option<&dyn Progress>) -> Result<(), TaskError> {
        while let Some(front) = self.front() {
            if task.checkpoint() {
                let guard = lock(&self.run_lock);
                *lock(&self.current) = Some(Arc::clone(&front));
                front.run(None);
                *lock(&self.current) = None;
                drop(guard);

                if let Some(progress) = progress {
                    progress.tick();
                }
            } else {
                debug!("Task queue '{}' discarding task '{}'.", task.id(), front.id());
            }
            self.remove(&front);
        }
        Ok(())
    }

    fn on_stop(&self) {
        let current = lock(&self.current).clone();
        if let Some(child) = current {
            child.stop();
        }
    }
}

impl TaskQueue {
    pub fn new() -> Arc<Self> {
        TaskBase::from_job(Fifo::default())
    }

    /// Enqueues `task`. A finalized or stopped queue goes back to start.
    pub fn push(&self, task: Arc<dyn Task>) {
        lock(&self.job().queue).push_back(task);
        self.control().rewind();
    }

    pub fn pop(&self) -> Option<Arc<dyn Task>> {
        lock(&self.job().queue).pop_front()
    }

    pub fn size(&self) -> usize {
        lock(&self.job().queue).len()
    }

    pub fn empty(&self) -> bool {
        lock(&self.job().queue).is_empty()
    }
}
