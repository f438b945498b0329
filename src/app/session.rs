use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{info, warn};
use taskcore::{Event, Priority, Process, Progress, Status, Task, TaskList, TaskQueue, TaskTree};
use thiserror::Error;

use super::config::{Args, Mode};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("task {0} not found")]
    UnknownTask(usize),
    #[error("task {0} cannot depend on itself or on a later task")]
    ForwardDependency(usize),
    #[error("no tasks to run")]
    NoTasks,
    #[error("tasks are already running")]
    Busy,
    #[error("nothing is running")]
    Idle,
}

struct Entry {
    process: Arc<Process>,
    parents: Vec<usize>,
}

/// One row of the status table.
pub struct TaskRow {
    pub position: usize,
    pub status: Status,
    pub exit_code: Option<i32>,
    pub command: String,
}

/// Commands collected from the prompt or the command line and the composite
/// task built from them.
pub struct Session {
    entries: Vec<Entry>,
    mode: Mode,
    priority: Priority,
    capture_output: bool,
    current: Option<Arc<dyn Task>>,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl Session {
    pub fn new(args: &Args) -> Self {
        let (sender, receiver) = unbounded();
        Session {
            entries: Vec::new(),
            mode: args.mode,
            priority: args.priority.into(),
            capture_output: args.capture_output,
            current: None,
            sender,
            receiver,
        }
    }

    /// Adds a command and returns its 1-based position.
    pub fn add(&mut self, command: String, parents: Vec<usize>) -> Result<usize, SessionError> {
        let position = self.entries.len() + 1;
        if let Some(&parent) = parents.iter().find(|&&parent| parent >= position) {
            return Err(SessionError::ForwardDependency(parent));
        }
        if !parents.is_empty() && self.mode != Mode::Tree {
            warn!("Dependencies of task {} are ignored in {:?} mode.", position, self.mode);
        }

        let process = Process::builder(command)
            .priority(self.priority)
            .capture_output(self.capture_output)
            .build();
        info!("Task '{}' created for position {}.", process.id(), position);
        self.entries.push(Entry { process, parents });
        Ok(position)
    }

    /// Adds `child` after `parents` once every command is known.
    pub fn depend(&mut self, child: usize, parents: &[usize]) -> Result<(), SessionError> {
        for &position in std::iter::once(&child).chain(parents) {
            if position == 0 || position > self.entries.len() {
                return Err(SessionError::UnknownTask(position));
            }
        }
        self.entries[child - 1].parents.extend_from_slice(parents);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_busy(&self) -> bool {
        self.current.as_ref().is_some_and(|task| task.status().is_active() || task.status() == Status::Stopping)
    }

    /// Assembles a fresh composite from the current commands.
    fn build(&mut self) -> Result<Arc<dyn Task>, SessionError> {
        if self.entries.is_empty() {
            return Err(SessionError::NoTasks);
        }
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        for entry in &self.entries {
            entry.process.reset();
            self.forward_events(entry.process.as_ref());
        }
        let processes = self.entries.iter().map(|entry| entry.process.clone() as Arc<dyn Task>);

        let task: Arc<dyn Task> = match self.mode {
            Mode::List => TaskList::with_tasks(processes),
            Mode::Queue => {
                let queue = TaskQueue::new();
                for process in processes {
                    queue.push(process);
                }
                queue
            }
            Mode::Tree => {
                let tree = TaskTree::new();
                for entry in &self.entries {
                    let parents: Vec<Arc<dyn Task>> = entry
                        .parents
                        .iter()
                        .map(|&parent| self.entries[parent - 1].process.clone() as Arc<dyn Task>)
                        .collect();
                    tree.add_task(entry.process.clone(), &parents);
                }
                tree
            }
        };
        self.forward_events(task.as_ref());
        self.current = Some(Arc::clone(&task));
        Ok(task)
    }

    fn forward_events(&self, task: &dyn Task) {
        let sender = self.sender.clone();
        task.events().subscribe_all(move |event| {
            let _ = sender.send(event.clone());
        });
    }

    /// Runs every command and waits for them.
    pub fn run(&mut self, progress: Option<Arc<dyn Progress>>) -> Result<Status, SessionError> {
        let task = self.build()?;
        task.run(progress);
        Ok(task.status())
    }

    /// Starts every command in the background.
    pub fn start(&mut self, progress: Option<Arc<dyn Progress>>) -> Result<(), SessionError> {
        let task = self.build()?;
        task.run_async(progress);
        Ok(())
    }

    fn current(&self) -> Result<&Arc<dyn Task>, SessionError> {
        self.current.as_ref().ok_or(SessionError::Idle)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.current()?.pause();
        Ok(())
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.current()?.resume();
        Ok(())
    }

    pub fn stop(&self) -> Result<(), SessionError> {
        self.current()?.stop();
        Ok(())
    }

    pub fn status(&self) -> Option<Status> {
        self.current.as_ref().map(|task| task.status())
    }

    /// Forgets every command.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        self.entries.clear();
        self.current = None;
        Ok(())
    }

    pub fn rows(&self) -> Vec<TaskRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| TaskRow {
                position: index + 1,
                status: entry.process.status(),
                exit_code: entry.process.exit_code(),
                command: entry.process.command().to_string(),
            })
            .collect()
    }

    pub fn output(&self, position: usize) -> Result<Vec<String>, SessionError> {
        position
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(|entry| entry.process.output())
            .ok_or(SessionError::UnknownTask(position))
    }

    /// Every command finished and exited with code 0.
    pub fn succeeded(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.process.status() == Status::Finalized && entry.process.exit_code() == Some(0))
    }

    /// Events received since the last call.
    pub fn drain_events(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}
