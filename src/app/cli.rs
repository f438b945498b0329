use std::{
    io::{self, Write},
    process::ExitCode,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, terminal,
};
use log::{debug, error};

use super::config::{parse_position, parse_positions, Args};
use super::session::{Session, TaskRow};

const PROMPT: &str = ">>> ";

const HELP: &str = "\
add <command>            queue a shell command
after <p1,p2> <command>  queue a command that waits for p1, p2 (tree mode)
run                      run every command and wait
start                    run every command in the background
pause | resume | stop    control the running commands
status                   state of the running commands
list                     every command with its state
output <n>               captured output of command n
reset                    forget every command
exit                     quit";

/// Raw mode for the lifetime of the guard.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            error!("Failed to disable raw mode: {}", err);
        }
    }
}

/// Line editor with history. Returns `None` on Ctrl-C or Ctrl-D.
struct Prompt {
    history: Vec<String>,
}

impl Prompt {
    fn new() -> Self {
        Prompt { history: Vec::new() }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let _raw = RawModeGuard::enable()?;
        let mut out = io::stdout();
        let mut input = String::new();
        let mut history_index = self.history.len();
        redraw(&mut out, &input)?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    write!(out, "\r\n")?;
                    return Ok(None);
                }
                KeyCode::Enter => {
                    write!(out, "\r\n")?;
                    out.flush()?;
                    break;
                }
                KeyCode::Up => {
                    history_index = history_index.saturating_sub(1);
                    if let Some(line) = self.history.get(history_index) {
                        input = line.clone();
                        redraw(&mut out, &input)?;
                    }
                }
                KeyCode::Down => {
                    history_index = (history_index + 1).min(self.history.len());
                    input = self.history.get(history_index).cloned().unwrap_or_default();
                    redraw(&mut out, &input)?;
                }
                KeyCode::Backspace => {
                    input.pop();
                    redraw(&mut out, &input)?;
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    write!(out, "{}", c)?;
                    out.flush()?;
                }
                _ => {}
            }
        }

        let line = input.trim().to_string();
        if !line.is_empty() && self.history.last() != Some(&line) {
            self.history.push(line.clone());
        }
        Ok(Some(line))
    }
}

fn redraw(out: &mut impl Write, input: &str) -> io::Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine)
    )?;
    write!(out, "{}{}", PROMPT, input)?;
    out.flush()
}

fn print_rows(rows: &[TaskRow]) {
    if rows.is_empty() {
        println!("No tasks");
        return;
    }
    println!("{:<4} {:<10} {:<6} Command", "#", "Status", "Exit");
    println!("{}", "-".repeat(60));
    for row in rows {
        let exit_code = row
            .exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<10} {:<6} {}",
            row.position,
            row.status.to_string(),
            exit_code,
            row.command
        );
    }
}

fn print_events(session: &Session) {
    for event in session.drain_events() {
        match event.message() {
            Some(message) => println!("task {}: {}: {}", event.task_id, event.kind, message),
            None => println!("task {}: {}", event.task_id, event.kind),
        }
    }
}

/// Runs the commands given on the command line and prints a summary.
pub fn run_batch(args: &Args) -> ExitCode {
    let mut session = Session::new(args);
    for command in &args.commands {
        if let Err(err) = session.add(command.clone(), Vec::new()) {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    }
    for dependency in &args.after {
        if let Err(err) = session.depend(dependency.child, &dependency.parents) {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    }

    let progress = args.progress.reporter(session.len());
    match session.run(progress) {
        Ok(status) => println!("Finished: {}", status),
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    }
    print_rows(&session.rows());

    if session.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Interactive prompt; commands are collected until `run` or `start`.
pub fn run_cli(args: &Args) -> io::Result<()> {
    println!("Task runner started in {:?} mode. Enter a command, `help` or `exit`.", args.mode);
    let mut session = Session::new(args);
    let mut prompt = Prompt::new();

    while let Some(line) = prompt.read_line()? {
        let (command, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let rest = rest.trim();

        let result = match command {
            "" => Ok(()),
            "add" if rest.is_empty() => {
                println!("Command to execute must be specified.");
                Ok(())
            }
            "add" => session.add(rest.to_string(), Vec::new()).map(|position| {
                println!("Added task {}", position);
            }),
            "after" => match rest.split_once(' ') {
                Some((parents, command)) if !command.trim().is_empty() => match parse_positions(parents) {
                    Ok(parents) => session.add(command.trim().to_string(), parents).map(|position| {
                        println!("Added task {}", position);
                    }),
                    Err(err) => {
                        println!("{}", err);
                        Ok(())
                    }
                },
                _ => {
                    println!("Usage: after <p1,p2> <command>");
                    Ok(())
                }
            },
            "run" => {
                let progress = args.progress.reporter(session.len());
                session.run(progress).map(|status| {
                    print_events(&session);
                    println!("Finished: {}", status);
                    print_rows(&session.rows());
                })
            }
            "start" => session.start(None).map(|()| println!("Started in the background")),
            "pause" => session.pause(),
            "resume" => session.resume(),
            "stop" => session.stop(),
            "status" => {
                match session.status() {
                    Some(status) => println!("Status: {}", status),
                    None => println!("Nothing has run yet"),
                }
                Ok(())
            }
            "list" => {
                print_rows(&session.rows());
                Ok(())
            }
            "output" => match parse_position(rest) {
                Ok(position) => session.output(position).map(|lines| {
                    for line in lines {
                        println!("{}", line);
                    }
                }),
                Err(err) => {
                    println!("{}", err);
                    Ok(())
                }
            },
            "reset" => session.reset().map(|()| println!("Tasks cleared")),
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "exit" | "quit" => break,
            other => {
                println!("Unknown command: {}. Type `help` for the list.", other);
                Ok(())
            }
        };

        if let Err(err) = result {
            println!("{}", err);
        }
        print_events(&session);
    }

    if let Err(err) = session.stop() {
        debug!("Nothing to stop on exit: {}", err);
    }
    println!("Exiting the program...");
    Ok(())
}
