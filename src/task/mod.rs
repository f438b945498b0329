pub mod base;
pub mod chrono;
pub mod control;
pub mod error;
pub mod hub;

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use crate::models::status::Status;
use crate::progress::Progress;

use hub::EventHub;

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of cancellable, pausable, observable work.
///
/// None of these operations fail: the outcome of a run is reported through
/// [`Task::events`] and the final [`Task::status`].
pub trait Task: Send + Sync {
    fn id(&self) -> TaskId;

    /// Runs the task on a worker thread and waits for it to finish.
    fn run(&self, progress: Option<Arc<dyn Progress>>);

    /// Runs the task on a detached worker thread and returns immediately.
    fn run_async(self: Arc<Self>, progress: Option<Arc<dyn Progress>>);

    fn pause(&self);

    fn resume(&self);

    /// Requests a stop. Only work that polls its status actually halts.
    fn stop(&self);

    /// Back to [`Status::Start`], forgetting every subscription.
    fn reset(&self);

    fn status(&self) -> Status;

    /// Duration of the last execution, excluding paused intervals.
    fn time(&self) -> Duration;

    fn events(&self) -> &EventHub;
}

/// Locks a mutex, recovering the data if another thread panicked with it held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
