use std::fmt;

use super::event::EventKind;

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Initial state; the only one from which a run starts executing.
    Start,
    Running,
    /// A pause was requested and has not been reached yet.
    Pausing,
    Paused,
    /// A stop was requested and has not been observed yet.
    Stopping,
    Stopped,
    Finalized,
    Error,
}

impl Status {
    /// Running, pausing or paused.
    pub fn is_active(self) -> bool {
        matches!(self, Status::Running | Status::Pausing | Status::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Stopped | Status::Finalized | Status::Error)
    }

    /// The event emitted when a task enters this state.
    pub fn event(self) -> Option<EventKind> {
        match self {
            Status::Start => None,
            Status::Running => Some(EventKind::Running),
            Status::Pausing => Some(EventKind::Pausing),
            Status::Paused => Some(EventKind::Paused),
            Status::Stopping => Some(EventKind::Stopping),
            Status::Stopped => Some(EventKind::Stopped),
            Status::Finalized => Some(EventKind::Finalized),
            Status::Error => Some(EventKind::Error),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Start => "start",
            Status::Running => "running",
            Status::Pausing => "pausing",
            Status::Paused => "paused",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
            Status::Finalized => "finalized",
            Status::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_terminal_states_do_not_overlap() {
        let all = [
            Status::Start,
            Status::Running,
            Status::Pausing,
            Status::Paused,
            Status::Stopping,
            Status::Stopped,
            Status::Finalized,
            Status::Error,
        ];
        for status in all {
            assert!(!(status.is_active() && status.is_terminal()), "{status}");
        }
        assert!(!Status::Start.is_active());
        assert!(!Status::Stopping.is_active());
    }

    #[test]
    fn only_start_has_no_event() {
        assert_eq!(Status::Start.event(), None);
        assert_eq!(Status::Pausing.event(), Some(EventKind::Pausing));
        assert_eq!(Status::Error.event(), Some(EventKind::Error));
    }
}
