use std::sync::{Arc, Mutex};

use log::{info, warn};

use super::launcher::{LaunchOptions, Priority, ProcessLauncher, SystemLauncher};
use crate::progress::Progress;
use crate::task::base::{Job, TaskBase};
use crate::task::control::TaskControl;
use crate::task::error::TaskError;
use crate::task::lock;

/// Runs one external command line.
pub struct ProcessJob {
    command: String,
    options: LaunchOptions,
    launcher: Arc<dyn ProcessLauncher>,
    pid: Mutex<Option<u32>>,
    exit_code: Mutex<Option<i32>>,
    output: Mutex<Vec<String>>,
}

/// A task that launches an external process and waits for it.
///
/// A zero exit code finalizes the task. A non-zero exit code emits an error
/// event but still finalizes it: the process ran, it just did not succeed.
/// Only failing to launch or to wait for the process puts the task in the
/// error state.
pub type Process = TaskBase<ProcessJob>;

impl Job for ProcessJob {
    fn execute(&self, task: &TaskControl, _progress: Option<&dyn Progress>) -> Result<(), TaskError> {
        *lock(&self.exit_code) = None;
        lock(&self.output).clear();

        info!("Task '{}' launching `{}`.", task.id(), self.command);
        let launched = self
            .launcher
            .spawn(&self.command, &self.options)
            .map_err(|err| TaskError::spawn(&self.command, err))?;

        *lock(&self.pid) = Some(launched.id());
        let report = launched.wait();
        *lock(&self.pid) = None;
        let report = report.map_err(|err| TaskError::wait(&self.command, err))?;

        *lock(&self.output) = report.output;
        let code = report.code.ok_or_else(|| TaskError::NoExitCode {
            command: self.command.clone(),
        })?;
        *lock(&self.exit_code) = Some(code);

        if code != 0 {
            warn!("Task '{}' command `{}` exited with code {}.", task.id(), self.command, code);
            task.emit_error(format!("command `{}` exited with code {}", self.command, code));
        }
        Ok(())
    }
}

impl Process {
    pub fn new(command: impl Into<String>, priority: Priority) -> Arc<Self> {
        ProcessBuilder::new(command).priority(priority).build()
    }

    pub fn builder(command: impl Into<String>) -> ProcessBuilder {
        ProcessBuilder::new(command)
    }

    pub fn command(&self) -> &str {
        &self.job().command
    }

    /// Priority of the running child, or the configured one when nothing is
    /// running or the platform cannot read it back.
    pub fn priority(&self) -> Priority {
        let job = self.job();
        let pid = *lock(&job.pid);
        pid.and_then(|pid| job.launcher.priority_of(pid))
            .unwrap_or(job.options.priority)
    }

    pub fn pid(&self) -> Option<u32> {
        *lock(&self.job().pid)
    }

    pub fn exit_code(&self) -> Option<i32> {
        *lock(&self.job().exit_code)
    }

    /// Lines captured from stdout and stderr during the last run.
    pub fn output(&self) -> Vec<String> {
        lock(&self.job().output).clone()
    }
}

/// Configures a [`Process`].
///
/// ```no_run
/// use taskcore::{Priority, Process, Task};
///
/// let process = Process::builder("cargo build")
///     .priority(Priority::BelowNormal)
///     .capture_output(true)
///     .build();
/// process.run(None);
/// for line in process.output() {
///     println!("{line}");
/// }
/// ```
pub struct ProcessBuilder {
    command: String,
    options: LaunchOptions,
    launcher: Option<Arc<dyn ProcessLauncher>>,
}

impl ProcessBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: LaunchOptions::default(),
            launcher: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.options.priority = priority;
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.options.capture_output = capture;
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn build(self) -> Arc<Process> {
        TaskBase::from_job(ProcessJob {
            command: self.command,
            options: self.options,
            launcher: self.launcher.unwrap_or_else(|| Arc::new(SystemLauncher)),
            pid: Mutex::new(None),
            exit_code: Mutex::new(None),
            output: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventKind;
    use crate::models::status::Status;
    use crate::task::Task;
    use crate::worker::launcher::LaunchedProcess;
    use std::io;

    struct FailingLauncher;

    impl ProcessLauncher for FailingLauncher {
        fn spawn(&self, _command_text: &str, _options: &LaunchOptions) -> io::Result<LaunchedProcess> {
            Err(io::Error::from_raw_os_error(2))
        }

        fn priority_of(&self, _pid: u32) -> Option<Priority> {
            None
        }
    }

    #[test]
    fn spawn_failure_is_an_execution_fault() {
        let process = Process::builder("anything").launcher(Arc::new(FailingLauncher)).build();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        process.events().on_error(move |message| sink.lock().unwrap().push(message.to_string()));

        process.run(None);

        assert_eq!(process.status(), Status::Error);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("error (2: "), "{}", errors[0]);
        assert!(errors[0].ends_with("anything"), "{}", errors[0]);
    }

    #[test]
    fn configured_priority_is_reported_when_idle() {
        let process = Process::new("true", Priority::BelowNormal);
        assert_eq!(process.priority(), Priority::BelowNormal);
        assert_eq!(process.command(), "true");
        assert_eq!(process.pid(), None);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_error_but_finalizes() {
        let process = Process::new("exit 1", Priority::Normal);
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        process.events().subscribe_all(move |event| sink.lock().unwrap().push(event.kind));

        process.run(None);

        assert_eq!(process.status(), Status::Finalized);
        assert_eq!(process.exit_code(), Some(1));
        assert_eq!(
            *kinds.lock().unwrap(),
            vec![EventKind::Running, EventKind::Error, EventKind::Finalized]
        );
        assert_eq!(process.last_error().as_deref(), Some("command `exit 1` exited with code 1"));
    }

    #[cfg(unix)]
    #[test]
    fn captured_output_is_kept() {
        let process = Process::builder("echo hello").capture_output(true).build();
        process.run(None);
        assert_eq!(process.output(), vec!["hello".to_string()]);
        assert_eq!(process.exit_code(), Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn rerun_forgets_the_previous_exit_code_and_output() {
        let marker = std::env::temp_dir().join(format!("taskcore-rerun-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);
        let command = format!("if [ -e '{}' ]; then kill -9 $$; fi; echo ok", marker.display());
        let process = Process::builder(command).capture_output(true).build();

        process.run(None);
        assert_eq!(process.status(), Status::Finalized);
        assert_eq!(process.exit_code(), Some(0));
        assert_eq!(process.output(), vec!["ok".to_string()]);

        std::fs::write(&marker, b"").unwrap();
        process.reset();
        process.run(None);
        std::fs::remove_file(&marker).unwrap();

        assert_eq!(process.status(), Status::Error);
        assert_eq!(process.exit_code(), None);
        assert!(process.output().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn killed_process_is_an_execution_fault() {
        let process = Process::new("kill -9 $$", Priority::Normal);
        process.run(None);
        assert_eq!(process.status(), Status::Error);
        assert_eq!(
            process.last_error().as_deref(),
            Some("command terminated without an exit code: kill -9 $$")
        );
    }
}
