use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex},
};

use log::error;

use super::{lock, TaskId};
use crate::models::event::{Event, EventKind, TaskRef};

pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Per-task table of handlers keyed by event kind.
///
/// Handlers of one kind run in subscription order, on the thread that emits
/// the event, with no lock held.
#[derive(Default)]
pub struct EventHub {
    handlers: Mutex<[Vec<EventHandler>; 8]>,
}

macro_rules! plain_subscription {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        pub fn $name<F>(&self, handler: F)
        where
            F: Fn(TaskId) + Send + Sync + 'static,
        {
            self.subscribe($kind, move |event: &Event| handler(event.task_id));
        }
    };
}

impl EventHub {
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe_handler(kind, Arc::new(handler));
    }

    pub fn subscribe_handler(&self, kind: EventKind, handler: EventHandler) {
        lock(&self.handlers)[kind.index()].push(handler);
    }

    /// Registers the same handler for every kind.
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        let mut handlers = lock(&self.handlers);
        for kind in EventKind::ALL {
            handlers[kind.index()].push(Arc::clone(&handler));
        }
    }

    /// Receives the error message.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, move |event: &Event| {
            if let Some(message) = event.message() {
                handler(message);
            }
        });
    }

    /// Receives a reference to the finished task.
    pub fn on_finalized<F>(&self, handler: F)
    where
        F: Fn(&TaskRef) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Finalized, move |event: &Event| {
            if let Some(task) = event.finalized_task() {
                handler(task);
            }
        });
    }

    plain_subscription!(on_paused, EventKind::Paused);
    plain_subscription!(on_pausing, EventKind::Pausing);
    plain_subscription!(on_resumed, EventKind::Resumed);
    plain_subscription!(on_running, EventKind::Running);
    plain_subscription!(on_stopped, EventKind::Stopped);
    plain_subscription!(on_stopping, EventKind::Stopping);

    pub fn len(&self, kind: EventKind) -> usize {
        lock(&self.handlers)[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.handlers).iter().all(Vec::is_empty)
    }

    pub(crate) fn clear(&self) {
        for handlers in lock(&self.handlers).iter_mut() {
            handlers.clear();
        }
    }

    /// Delivers `event` to a snapshot of the handlers for its kind. A panicking
    /// handler is logged and does not prevent the remaining ones from running.
    pub(crate) fn emit(&self, event: &Event) {
        let handlers = lock(&self.handlers)[event.kind.index()].clone();
        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!("Handler for {} of task '{}' panicked.", event.kind, event.task_id);
            }
        }
    }
}
