use std::{
    fmt,
    io::{self, BufRead, BufReader, Read},
    process::{Child, Command, Stdio},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

/// Scheduling priority of a launched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Idle,
    BelowNormal,
    #[default]
    Normal,
    AboveNormal,
    High,
    Realtime,
}

impl Priority {
    /// POSIX nice value.
    pub fn nice(self) -> i32 {
        match self {
            Priority::Idle => 19,
            Priority::BelowNormal => 10,
            Priority::Normal => 0,
            Priority::AboveNormal => -5,
            Priority::High => -10,
            Priority::Realtime => -20,
        }
    }

    pub fn from_nice(nice: i32) -> Self {
        match nice {
            15..=i32::MAX => Priority::Idle,
            5..=14 => Priority::BelowNormal,
            -2..=4 => Priority::Normal,
            -7..=-3 => Priority::AboveNormal,
            -15..=-8 => Priority::High,
            _ => Priority::Realtime,
        }
    }

    /// Windows priority class flag.
    pub fn priority_class(self) -> u32 {
        match self {
            Priority::Idle => 0x0000_0040,
            Priority::BelowNormal => 0x0000_4000,
            Priority::Normal => 0x0000_0020,
            Priority::AboveNormal => 0x0000_8000,
            Priority::High => 0x0000_0080,
            Priority::Realtime => 0x0000_0100,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Idle => "idle",
            Priority::BelowNormal => "below-normal",
            Priority::Normal => "normal",
            Priority::AboveNormal => "above-normal",
            Priority::High => "high",
            Priority::Realtime => "realtime",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    pub priority: Priority,
    /// Collect stdout and stderr instead of inheriting them.
    pub capture_output: bool,
}

/// Starts command lines as child processes.
pub trait ProcessLauncher: Send + Sync {
    fn spawn(&self, command_text: &str, options: &LaunchOptions) -> io::Result<LaunchedProcess>;

    /// Current priority of a running process, if it can be read.
    fn priority_of(&self, pid: u32) -> Option<Priority>;
}

/// How a launched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub output: Vec<String>,
}

/// A running child together with the readers draining its output.
pub struct LaunchedProcess {
    child: Child,
    output: Option<Receiver<String>>,
    readers: Vec<JoinHandle<()>>,
}

impl LaunchedProcess {
    pub fn new(mut child: Child) -> Self {
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        if stdout.is_none() && stderr.is_none() {
            return Self {
                child,
                output: None,
                readers: Vec::new(),
            };
        }

        let (sender, receiver) = unbounded();
        let mut readers = Vec::new();
        if let Some(stdout) = stdout {
            readers.push(spawn_reader(stdout, pid, "stdout", sender.clone()));
        }
        if let Some(stderr) = stderr {
            readers.push(spawn_reader(stderr, pid, "stderr", sender));
        }

        Self {
            child,
            output: Some(receiver),
            readers,
        }
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the child exits and every output line has been read.
    pub fn wait(mut self) -> io::Result<ExitReport> {
        let status = self.child.wait()?;
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        let output: Vec<String> = self
            .output
            .map(|receiver| receiver.try_iter().collect())
            .unwrap_or_default();

        Ok(ExitReport {
            code: status.code(),
            output,
        })
    }
}

fn spawn_reader<R>(stream: R, pid: u32, label: &'static str, sender: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            debug!("[{} {}] {}", pid, label, line);
            if sender.send(line).is_err() {
                break;
            }
        }
    })
}

fn configure(command: &mut Command, options: &LaunchOptions) {
    if options.capture_output {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    }
}

#[cfg(unix)]
mod posix {
    use std::{io, process::Command};

    use log::warn;

    use super::{configure, LaunchOptions, LaunchedProcess, Priority, ProcessLauncher};

    /// Runs command lines through `/bin/sh -c`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct PosixLauncher;

    impl ProcessLauncher for PosixLauncher {
        fn spawn(&self, command_text: &str, options: &LaunchOptions) -> io::Result<LaunchedProcess> {
            let mut command = Command::new("/bin/sh");
            command.arg("-c").arg(command_text);
            configure(&mut command, options);

            let child = command.spawn()?;
            if options.priority != Priority::Normal {
                set_priority(child.id(), options.priority);
            }
            Ok(LaunchedProcess::new(child))
        }

        fn priority_of(&self, pid: u32) -> Option<Priority> {
            // -1 is also a valid nice value; only errno tells them apart.
            unsafe { *errno() = 0 };
            let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
            if nice == -1 && unsafe { *errno() } != 0 {
                return None;
            }
            Some(Priority::from_nice(nice))
        }
    }

    #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "dragonfly"))]
    unsafe fn errno() -> *mut libc::c_int {
        libc::__errno_location()
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    unsafe fn errno() -> *mut libc::c_int {
        libc::__error()
    }

    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    unsafe fn errno() -> *mut libc::c_int {
        libc::__errno()
    }

    fn set_priority(pid: u32, priority: Priority) {
        let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, priority.nice()) };
        if result != 0 {
            warn!(
                "Failed to set priority {} on process {}: {}",
                priority,
                pid,
                io::Error::last_os_error()
            );
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{io, os::windows::process::CommandExt, process::Command};

    use super::{configure, LaunchOptions, LaunchedProcess, Priority, ProcessLauncher};

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    /// Runs command lines through `cmd /C`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WindowsLauncher;

    impl ProcessLauncher for WindowsLauncher {
        fn spawn(&self, command_text: &str, options: &LaunchOptions) -> io::Result<LaunchedProcess> {
            let mut command = Command::new("cmd");
            command
                .arg("/C")
                .raw_arg(command_text)
                .creation_flags(CREATE_NO_WINDOW | options.priority.priority_class());
            configure(&mut command, options);

            Ok(LaunchedProcess::new(command.spawn()?))
        }

        // Only the pid reaches this point and the child handle stays with
        // `LaunchedProcess`; callers fall back to the configured class.
        fn priority_of(&self, _pid: u32) -> Option<Priority> {
            None
        }
    }
}

#[cfg(unix)]
pub use posix::PosixLauncher as SystemLauncher;
#[cfg(windows)]
pub use windows::WindowsLauncher as SystemLauncher;

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn nice_values_round_trip_through_buckets() {
        for priority in [
            Priority::Idle,
            Priority::BelowNormal,
            Priority::Normal,
            Priority::AboveNormal,
            Priority::High,
            Priority::Realtime,
        ] {
            assert_eq!(Priority::from_nice(priority.nice()), priority);
        }
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let options = LaunchOptions {
            capture_output: true,
            ..LaunchOptions::default()
        };
        let launched = SystemLauncher.spawn("echo out; echo err 1>&2", &options).unwrap();
        let report = launched.wait().unwrap();

        assert_eq!(report.code, Some(0));
        let mut output = report.output;
        output.sort();
        assert_eq!(output, vec!["err".to_string(), "out".to_string()]);
    }

    #[test]
    fn reports_exit_code_without_capture() {
        let report = SystemLauncher
            .spawn("exit 3", &LaunchOptions::default())
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(report.code, Some(3));
        assert!(report.output.is_empty());
    }

    #[test]
    fn signal_termination_has_no_exit_code() {
        let report = SystemLauncher
            .spawn("kill -9 $$", &LaunchOptions::default())
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(report.code, None);
    }

    #[test]
    fn lowered_priority_is_visible_on_the_child() {
        let options = LaunchOptions {
            priority: Priority::Idle,
            capture_output: false,
        };
        let launched = SystemLauncher.spawn("sleep 0.3", &options).unwrap();
        let priority = SystemLauncher.priority_of(launched.id());
        launched.wait().unwrap();
        assert_eq!(priority, Some(Priority::Idle));
    }

    #[test]
    fn priority_of_a_reaped_child_is_unknown() {
        let launched = SystemLauncher.spawn("true", &LaunchOptions::default()).unwrap();
        let pid = launched.id();
        launched.wait().unwrap();
        assert_eq!(SystemLauncher.priority_of(pid), None);
    }
}
