use std::{str::FromStr, sync::Arc};

use clap::{Parser, ValueEnum};
use taskcore::progress::{ProgressBar, ProgressPercent, ProgressSpinner};
use taskcore::{Priority, Progress};

/// Run shell commands as observable tasks.
#[derive(Parser, Debug)]
#[command(name = "taskcore", version)]
pub struct Args {
    /// How the commands are combined.
    #[arg(long, value_enum, default_value_t = Mode::List)]
    pub mode: Mode,

    /// Scheduling priority of every launched command.
    #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
    pub priority: PriorityArg,

    /// Keep stdout and stderr of the commands instead of passing them through.
    #[arg(long)]
    pub capture_output: bool,

    #[arg(long, value_enum, default_value_t = ProgressKind::Bar)]
    pub progress: ProgressKind,

    /// Tree mode dependency, `CHILD:PARENT[,PARENT...]` using 1-based command
    /// positions. May be repeated.
    #[arg(long = "after", value_name = "CHILD:PARENTS")]
    pub after: Vec<Dependency>,

    /// Commands to run. Without any, an interactive prompt starts.
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    List,
    Queue,
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    Realtime,
}

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::Idle => Priority::Idle,
            PriorityArg::BelowNormal => Priority::BelowNormal,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::AboveNormal => Priority::AboveNormal,
            PriorityArg::High => Priority::High,
            PriorityArg::Realtime => Priority::Realtime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressKind {
    Bar,
    Percent,
    Spinner,
    None,
}

impl ProgressKind {
    pub fn reporter(self, total: usize) -> Option<Arc<dyn Progress>> {
        let progress: Arc<dyn Progress> = match self {
            ProgressKind::Bar => Arc::new(ProgressBar::new(0, total)),
            ProgressKind::Percent => Arc::new(ProgressPercent::new(0, total)),
            ProgressKind::Spinner => Arc::new(ProgressSpinner::new()),
            ProgressKind::None => return None,
        };
        progress.set_text("tasks");
        Some(progress)
    }
}

/// A command that must wait for others, by 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub child: usize,
    pub parents: Vec<usize>,
}

impl FromStr for Dependency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (child, parents) = value
            .split_once(':')
            .ok_or_else(|| format!("expected CHILD:PARENTS, got `{}`", value))?;
        Ok(Dependency {
            child: parse_position(child)?,
            parents: parse_positions(parents)?,
        })
    }
}

pub fn parse_position(text: &str) -> Result<usize, String> {
    match text.trim().parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(format!("invalid task position `{}`", text.trim())),
    }
}

pub fn parse_positions(text: &str) -> Result<Vec<usize>, String> {
    text.split(',').map(parse_position).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dependencies() {
        let dependency: Dependency = "3:1,2".parse().unwrap();
        assert_eq!(
            dependency,
            Dependency {
                child: 3,
                parents: vec![1, 2]
            }
        );
        assert!("3".parse::<Dependency>().is_err());
        assert!("0:1".parse::<Dependency>().is_err());
        assert!("2:x".parse::<Dependency>().is_err());
    }

    #[test]
    fn parses_command_line() {
        let args = Args::try_parse_from([
            "taskcore",
            "--mode",
            "tree",
            "--priority",
            "below-normal",
            "--after",
            "2:1",
            "make",
            "make test",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::Tree);
        assert_eq!(Priority::from(args.priority), Priority::BelowNormal);
        assert_eq!(args.after.len(), 1);
        assert_eq!(args.commands, vec!["make".to_string(), "make test".to_string()]);
        assert!(!args.capture_output);
    }
}
