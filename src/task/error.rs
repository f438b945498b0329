use std::io;

use thiserror::Error;

use super::TaskId;

/// Why an execution failed.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("error ({code}: {source}) when executing the command: {command}")]
    Spawn {
        command: String,
        code: i32,
        #[source]
        source: io::Error,
    },

    #[error("error ({code}: {source}) when waiting for the command: {command}")]
    Wait {
        command: String,
        code: i32,
        #[source]
        source: io::Error,
    },

    #[error("command terminated without an exit code: {command}")]
    NoExitCode { command: String },

    #[error("dependency cycle detected at task {0}")]
    DependencyCycle(TaskId),

    #[error("failed to start worker thread: {0}")]
    Worker(#[source] io::Error),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }

    pub(crate) fn spawn(command: &str, source: io::Error) -> Self {
        TaskError::Spawn {
            command: command.to_string(),
            code: source.raw_os_error().unwrap_or(-1),
            source,
        }
    }

    pub(crate) fn wait(command: &str, source: io::Error) -> Self {
        TaskError::Wait {
            command: command.to_string(),
            code: source.raw_os_error().unwrap_or(-1),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_message_is_passed_through() {
        assert_eq!(TaskError::failed("boom").to_string(), "boom");
    }

    #[test]
    fn spawn_error_embeds_os_code_and_command() {
        let source = io::Error::from_raw_os_error(2);
        let message = TaskError::spawn("missing-binary --flag", source).to_string();
        assert!(message.starts_with("error (2: "), "{message}");
        assert!(message.ends_with("missing-binary --flag"), "{message}");
    }
}
