use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::task::{Task, TaskId};

/// Kind of a task notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Paused,
    Pausing,
    Resumed,
    Running,
    Stopped,
    Stopping,
    Finalized,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Error,
        EventKind::Paused,
        EventKind::Pausing,
        EventKind::Resumed,
        EventKind::Running,
        EventKind::Stopped,
        EventKind::Stopping,
        EventKind::Finalized,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            EventKind::Error => 0,
            EventKind::Paused => 1,
            EventKind::Pausing => 2,
            EventKind::Resumed => 3,
            EventKind::Running => 4,
            EventKind::Stopped => 5,
            EventKind::Stopping => 6,
            EventKind::Finalized => 7,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Error => "task_error",
            EventKind::Paused => "task_paused",
            EventKind::Pausing => "task_pausing",
            EventKind::Resumed => "task_resumed",
            EventKind::Running => "task_running",
            EventKind::Stopped => "task_stopped",
            EventKind::Stopping => "task_stopping",
            EventKind::Finalized => "task_finalized",
        };
        f.write_str(name)
    }
}

/// Non-owning reference to the task that emitted an event.
#[derive(Clone)]
pub struct TaskRef {
    id: TaskId,
    task: Weak<dyn Task>,
}

impl TaskRef {
    pub(crate) fn new(id: TaskId, task: Weak<dyn Task>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The task, if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Task>> {
        self.task.upgrade()
    }
}

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRef")
            .field("id", &self.id)
            .field("alive", &(self.task.strong_count() > 0))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Plain,
    Error { message: String },
    Finalized { task: TaskRef },
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub task_id: TaskId,
    pub payload: Payload,
}

impl Event {
    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Payload::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn finalized_task(&self) -> Option<&TaskRef> {
        match &self.payload {
            Payload::Finalized { task } => Some(task),
            _ => None,
        }
    }
}
