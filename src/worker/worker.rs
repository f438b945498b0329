use std::{
    io,
    thread
};

use log::error;

use crate::task::TaskId;

fn builder(id: TaskId) -> thread::Builder {
    thread::Builder::new().name(format!("task-{}", id))
}

/// Runs `work` on a new worker thread named after the task and waits for it.
pub fn run_joined<F>(id: TaskId, work: F) -> io::Result<()>
where
    F: FnOnce() + Send,
{
    thread::scope(|scope| {
        let handle = builder(id).spawn_scoped(scope, work)?;
        if handle.join().is_err() {
            error!("Worker thread of task '{}' panicked.", id);
        }
        Ok(())
    })
}

/// Runs `work` on a new detached worker thread named after the task.
pub fn spawn_detached<F>(id: TaskId, work: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    builder(id).spawn(work).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn joined_worker_runs_on_a_named_thread() {
        let id = TaskId::next();
        let mut name = None;
        run_joined(id, || name = thread::current().name().map(str::to_string)).unwrap();
        assert_eq!(name, Some(format!("task-{}", id)));
    }

    #[test]
    fn detached_worker_reports_back() {
        let (sender, receiver) = unbounded();
        spawn_detached(TaskId::next(), move || sender.send(42).unwrap()).unwrap();
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(42));
    }
}
