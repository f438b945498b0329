use std::{
    sync::{Arc, Condvar, Mutex, PoisonError, Weak},
    time::Duration,
};

use log::{debug, error, info};

use super::chrono::Chrono;
use super::error::TaskError;
use super::hub::EventHub;
use super::{lock, Task, TaskId};
use crate::models::event::{Event, EventKind, Payload, TaskRef};
use crate::models::status::Status;

/// State machine and event hub shared by every task.
///
/// Status changes happen under the status lock; the matching event is emitted
/// after the lock is released, so handlers may call back into the task.
pub struct TaskControl {
    id: TaskId,
    this: Weak<dyn Task>,
    status: Mutex<Status>,
    wakeup: Condvar,
    hub: EventHub,
    chrono: Mutex<Chrono>,
    last_error: Mutex<Option<String>>,
}

impl TaskControl {
    pub(crate) fn new(this: Weak<dyn Task>) -> Self {
        Self {
            id: TaskId::next(),
            this,
            status: Mutex::new(Status::Start),
            wakeup: Condvar::new(),
            hub: EventHub::default(),
            chrono: Mutex::new(Chrono::default()),
            last_error: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn status(&self) -> Status {
        *lock(&self.status)
    }

    /// The task this control belongs to, while it is alive.
    pub fn handle(&self) -> Option<Arc<dyn Task>> {
        self.this.upgrade()
    }

    pub fn events(&self) -> &EventHub {
        &self.hub
    }

    pub fn is_stopping(&self) -> bool {
        matches!(self.status(), Status::Stopping | Status::Stopped)
    }

    pub fn time(&self) -> Duration {
        lock(&self.chrono).elapsed()
    }

    /// Last error message reported by this task, if any.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Cooperative suspension point for running work.
    ///
    /// A pending pause is reached here: the task becomes paused and the call
    /// blocks until it is resumed or stopped. Returns `false` once a stop has
    /// been requested.
    pub fn checkpoint(&self) -> bool {
        let mut status = lock(&self.status);
        if *status == Status::Pausing {
            *status = Status::Paused;
            drop(status);
            lock(&self.chrono).pause();
            info!("Task '{}' paused.", self.id);
            self.emit(EventKind::Paused);

            status = self
                .wakeup
                .wait_while(lock(&self.status), |status| *status == Status::Paused)
                .unwrap_or_else(PoisonError::into_inner);
            lock(&self.chrono).resume();
        }
        !matches!(*status, Status::Stopping | Status::Stopped)
    }

    /// Emits `kind` on behalf of the running work.
    pub fn emit(&self, kind: EventKind) {
        let payload = match kind {
            EventKind::Error => Payload::Error {
                message: self.last_error().unwrap_or_default(),
            },
            EventKind::Finalized => Payload::Finalized {
                task: TaskRef::new(self.id, self.this.clone()),
            },
            _ => Payload::Plain,
        };
        self.hub.emit(&Event {
            kind,
            task_id: self.id,
            payload,
        });
    }

    /// Records `message` as the last error and emits an error event without
    /// changing the status.
    pub fn emit_error(&self, message: impl Into<String>) {
        *lock(&self.last_error) = Some(message.into());
        self.emit(EventKind::Error);
    }

    /// `start -> running`. Returns `false` if the task was not in `start`.
    pub(crate) fn begin(&self) -> bool {
        {
            let mut status = lock(&self.status);
            if *status != Status::Start {
                return false;
            }
            *status = Status::Running;
        }
        lock(&self.chrono).run();
        info!("Task '{}' running.", self.id);
        self.emit(EventKind::Running);
        true
    }

    /// Moves a running task to its terminal state.
    pub(crate) fn finish(&self, outcome: Result<(), TaskError>) {
        let elapsed = lock(&self.chrono).stop();
        let next = match outcome {
            Ok(()) => {
                let mut status = lock(&self.status);
                let next = if *status == Status::Stopping {
                    Status::Stopped
                } else {
                    Status::Finalized
                };
                *status = next;
                next
            }
            Err(err) => {
                error!("Task '{}' failed: {}", self.id, err);
                *lock(&self.last_error) = Some(err.to_string());
                *lock(&self.status) = Status::Error;
                Status::Error
            }
        };
        self.wakeup.notify_all();
        info!("Task '{}' {} after {:?}.", self.id, next, elapsed);
        if let Some(kind) = next.event() {
            self.emit(kind);
        }
    }

    /// `start -> error` for a run that could not even begin.
    pub(crate) fn abort(&self, err: TaskError) {
        {
            let mut status = lock(&self.status);
            if *status != Status::Start {
                return;
            }
            *status = Status::Error;
        }
        error!("Task '{}' could not start: {}", self.id, err);
        *lock(&self.last_error) = Some(err.to_string());
        self.emit(EventKind::Error);
    }

    /// `running -> pausing`.
    pub(crate) fn pause(&self) {
        {
            let mut status = lock(&self.status);
            if *status != Status::Running {
                return;
            }
            *status = Status::Pausing;
        }
        info!("Task '{}' pausing.", self.id);
        self.emit(EventKind::Pausing);
    }

    pub(crate) fn resume(&self) {
        self.emit(EventKind::Resumed);
        {
            let mut status = lock(&self.status);
            if !matches!(*status, Status::Paused | Status::Pausing) {
                return;
            }
            *status = Status::Running;
        }
        self.wakeup.notify_all();
        info!("Task '{}' resumed.", self.id);
        self.emit(EventKind::Running);
    }

    /// Returns `true` if the task moved to `stopping`.
    pub(crate) fn stop(&self) -> bool {
        {
            let mut status = lock(&self.status);
            if !status.is_active() {
                return false;
            }
            *status = Status::Stopping;
        }
        self.wakeup.notify_all();
        info!("Task '{}' stopping.", self.id);
        self.emit(EventKind::Stopping);
        true
    }

    pub(crate) fn reset(&self) {
        *lock(&self.status) = Status::Start;
        self.wakeup.notify_all();
        self.hub.clear();
        *lock(&self.last_error) = None;
        lock(&self.chrono).reset();
        debug!("Task '{}' reset.", self.id);
    }

    /// Makes a finished task runnable again, keeping its subscriptions.
    pub(crate) fn rewind(&self) -> bool {
        let mut status = lock(&self.status);
        if matches!(*status, Status::Finalized | Status::Stopped) {
            *status = Status::Start;
            debug!("Task '{}' rewound to start.", self.id);
            return true;
        }
        false
    }
}
