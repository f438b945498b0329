use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Weak},
    time::Duration,
};

use log::{debug, warn};

use super::control::TaskControl;
use super::error::TaskError;
use super::hub::EventHub;
use super::{Task, TaskId};
use crate::models::status::Status;
use crate::progress::Progress;
use crate::worker::worker::{run_joined, spawn_detached};

/// The work a [`TaskBase`] performs when it runs.
pub trait Job: Send + Sync + 'static {
    /// Does the work. Long-running work should call
    /// [`TaskControl::checkpoint`] regularly to honor pause and stop requests.
    fn execute(&self, task: &TaskControl, progress: Option<&dyn Progress>) -> Result<(), TaskError>;

    /// Called after a stop request moved the task to `stopping`.
    fn on_stop(&self) {}
}

/// A [`Task`] whose lifecycle is driven by [`TaskControl`] and whose work is
/// supplied by a [`Job`].
pub struct TaskBase<J: Job> {
    control: TaskControl,
    job: J,
}

impl<J: Job> TaskBase<J> {
    pub fn from_job(job: J) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let this: Weak<dyn Task> = this.clone();
            TaskBase {
                control: TaskControl::new(this),
                job,
            }
        })
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub fn control(&self) -> &TaskControl {
        &self.control
    }

    pub fn last_error(&self) -> Option<String> {
        self.control.last_error()
    }

    /// Worker-thread body. Never panics.
    fn execute_task(&self, progress: Option<&dyn Progress>) {
        if !self.control.begin() {
            debug!("Task '{}' is not in start state, run ignored.", self.control.id());
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.job.execute(&self.control, progress)))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));

        self.control.finish(outcome);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<J: Job> Task for TaskBase<J> {
    fn id(&self) -> TaskId {
        self.control.id()
    }

    fn run(&self, progress: Option<Arc<dyn Progress>>) {
        if let Err(err) = run_joined(self.id(), || self.execute_task(progress.as_deref())) {
            self.control.abort(TaskError::Worker(err));
        }
    }

    fn run_async(self: Arc<Self>, progress: Option<Arc<dyn Progress>>) {
        let task = Arc::clone(&self);
        if let Err(err) = spawn_detached(self.id(), move || task.execute_task(progress.as_deref())) {
            self.control.abort(TaskError::Worker(err));
        }
    }

    fn pause(&self) {
        self.control.pause();
    }

    fn resume(&self) {
        self.control.resume();
    }

    fn stop(&self) {
        if self.control.stop() {
            self.job.on_stop();
        }
    }

    fn reset(&self) {
        self.control.reset();
    }

    fn status(&self) -> Status {
        self.control.status()
    }

    fn time(&self) -> Duration {
        self.control.time()
    }

    fn events(&self) -> &EventHub {
        self.control.events()
    }
}

impl<J: Job> Drop for TaskBase<J> {
    fn drop(&mut self) {
        if self.control.status().is_active() {
            warn!("Task '{}' dropped while {}, requesting stop.", self.control.id(), self.control.status());
            Task::stop(self);
        }
    }
}

/// [`Job`] backed by a closure.
pub struct FnJob<F>(F);

impl<F> Job for FnJob<F>
where
    F: Fn(&TaskControl, Option<&dyn Progress>) -> Result<(), TaskError> + Send + Sync + 'static,
{
    fn execute(&self, task: &TaskControl, progress: Option<&dyn Progress>) -> Result<(), TaskError> {
        (self.0)(task, progress)
    }
}

pub type FnTask<F> = TaskBase<FnJob<F>>;

/// Creates a task that runs `work` when executed.
///
/// ```
/// use taskcore::{from_fn, Status, Task};
///
/// let task = from_fn(|_, _| Ok(()));
/// task.run(None);
/// assert_eq!(task.status(), Status::Finalized);
/// ```
pub fn from_fn<F>(work: F) -> Arc<FnTask<F>>
where
    F: Fn(&TaskControl, Option<&dyn Progress>) -> Result<(), TaskError> + Send + Sync + 'static,
{
    TaskBase::from_job(FnJob(work))
}
