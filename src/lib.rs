//! Cancellable, pausable, observable units of work.
//!
//! A [`Task`] is driven by a small state machine ([`Status`]) and reports every
//! transition through its [`EventHub`]. Leaf work is either a closure
//! ([`from_fn`]) or an external command ([`Process`]); composites run other
//! tasks in order ([`TaskList`]), first-in first-out ([`TaskQueue`]) or by
//! dependency ([`TaskTree`]).
//!
//! ```no_run
//! use taskcore::{Priority, Process, Task, TaskList};
//!
//! let list = TaskList::new();
//! list.push_back(Process::new("echo build", Priority::Normal));
//! list.push_back(Process::new("echo test", Priority::Normal));
//! list.events().on_finalized(|task| println!("task {} done", task.id()));
//! list.run(None);
//! ```

pub mod manager;
pub mod models;
pub mod progress;
pub mod task;
pub mod worker;

pub use manager::task_list::TaskList;
pub use manager::task_queue::TaskQueue;
pub use manager::task_tree::TaskTree;
pub use models::event::{Event, EventKind, Payload, TaskRef};
pub use models::status::Status;
pub use progress::{CountingProgress, Progress};
pub use task::base::{from_fn, FnJob, FnTask, Job, TaskBase};
pub use task::control::TaskControl;
pub use task::error::TaskError;
pub use task::hub::{EventHandler, EventHub};
pub use task::{Task, TaskId};
pub use worker::launcher::{ExitReport, LaunchOptions, LaunchedProcess, Priority, ProcessLauncher, SystemLauncher};
pub use worker::process::{Process, ProcessBuilder, ProcessJob};
