use std::{
    io::{self, Stdout, Write},
    sync::Mutex,
};

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use super::{Progress, ProgressState};
use crate::task::lock;

const BAR_WIDTH: usize = 50;
const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

struct Console<W> {
    state: ProgressState,
    out: W,
}

impl<W: Write> Console<W> {
    fn new(out: W, minimum: usize, maximum: usize) -> Self {
        Self {
            state: ProgressState::new(minimum, maximum),
            out,
        }
    }

    fn rewind_line(&mut self) -> io::Result<()> {
        queue!(self.out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))
    }

    fn redraw(&mut self, line: String) -> io::Result<()> {
        self.rewind_line()?;
        queue!(self.out, Print(line))?;
        self.finish_line()
    }

    fn finish_line(&mut self) -> io::Result<()> {
        if self.state.is_complete() {
            queue!(self.out, Print("\n"))?;
        }
        self.out.flush()
    }
}

/// Colored console bar.
pub struct ProgressBar<W = Stdout> {
    console: Mutex<Console<W>>,
}

impl ProgressBar<Stdout> {
    pub fn new(minimum: usize, maximum: usize) -> Self {
        Self::with_writer(io::stdout(), minimum, maximum)
    }
}

impl<W: Write + Send> ProgressBar<W> {
    pub fn with_writer(out: W, minimum: usize, maximum: usize) -> Self {
        Self {
            console: Mutex::new(Console::new(out, minimum, maximum)),
        }
    }

    fn render(console: &mut Console<W>, percent: u8) -> io::Result<()> {
        let filled = BAR_WIDTH * percent as usize / 100;
        let label = format!("{} ", console.state.text());
        console.rewind_line()?;
        queue!(
            console.out,
            Print(label),
            SetForegroundColor(Color::Green),
            Print("#".repeat(filled)),
            SetForegroundColor(Color::DarkGrey),
            Print("-".repeat(BAR_WIDTH - filled)),
            ResetColor,
            Print(format!(" {:>3}%", percent))
        )?;
        console.finish_line()
    }
}

impl<W: Write + Send> Progress for ProgressBar<W> {
    fn advance(&self, increment: usize) -> bool {
        let mut console = lock(&self.console);
        if let Some(percent) = console.state.advance(increment) {
            let _ = Self::render(&mut console, percent);
        }
        !console.state.is_complete()
    }

    fn set_range(&self, minimum: usize, maximum: usize) {
        lock(&self.console).state.set_range(minimum, maximum);
    }

    fn set_text(&self, text: &str) {
        lock(&self.console).state.set_text(text);
    }

    fn reset(&self) {
        lock(&self.console).state.reset();
    }
}

/// Plain percentage, one line rewritten in place.
pub struct ProgressPercent<W = Stdout> {
    console: Mutex<Console<W>>,
}

impl ProgressPercent<Stdout> {
    pub fn new(minimum: usize, maximum: usize) -> Self {
        Self::with_writer(io::stdout(), minimum, maximum)
    }
}

impl<W: Write + Send> ProgressPercent<W> {
    pub fn with_writer(out: W, minimum: usize, maximum: usize) -> Self {
        Self {
            console: Mutex::new(Console::new(out, minimum, maximum)),
        }
    }
}

impl<W: Write + Send> Progress for ProgressPercent<W> {
    fn advance(&self, increment: usize) -> bool {
        let mut console = lock(&self.console);
        if let Some(percent) = console.state.advance(increment) {
            let line = format!("{} {}%", console.state.text(), percent);
            let _ = console.redraw(line);
        }
        !console.state.is_complete()
    }

    fn set_range(&self, minimum: usize, maximum: usize) {
        lock(&self.console).state.set_range(minimum, maximum);
    }

    fn set_text(&self, text: &str) {
        lock(&self.console).state.set_text(text);
    }

    fn reset(&self) {
        lock(&self.console).state.reset();
    }
}

/// Spinner for work of unknown length; every tick advances one frame.
pub struct ProgressSpinner<W = Stdout> {
    console: Mutex<(Console<W>, usize)>,
}

impl ProgressSpinner<Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ProgressSpinner<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ProgressSpinner<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            console: Mutex::new((Console::new(out, 0, usize::MAX), 0)),
        }
    }
}

impl<W: Write + Send> Progress for ProgressSpinner<W> {
    fn advance(&self, increment: usize) -> bool {
        let mut guard = lock(&self.console);
        let (console, frame) = &mut *guard;
        *frame = frame.wrapping_add(increment);
        let symbol = SPINNER_FRAMES[*frame % SPINNER_FRAMES.len()];
        let line = format!("{} {}", symbol, console.state.text());
        let _ = console.redraw(line);
        true
    }

    fn set_text(&self, text: &str) {
        lock(&self.console).0.state.set_text(text);
    }

    fn reset(&self) {
        lock(&self.console).1 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Shared(std::sync::Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn bar_renders_percent_and_ends_the_line() {
        let out = Shared::default();
        let bar = ProgressBar::with_writer(out.clone(), 0, 2);
        bar.set_text("build");

        assert!(bar.tick());
        assert!(out.text().contains(" 50%"));
        assert!(!bar.tick());

        let text = out.text();
        assert!(text.contains("build"));
        assert!(text.contains("100%"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn percent_only_redraws_on_change() {
        let out = Shared::default();
        let percent = ProgressPercent::with_writer(out.clone(), 0, 1000);
        percent.tick();
        let after_first = out.text().len();
        percent.tick();
        percent.tick();
        percent.tick();
        percent.tick();
        percent.tick();
        percent.tick();
        percent.tick();
        percent.tick();
        assert_eq!(out.text().len(), after_first);
        percent.tick();
        assert!(out.text().contains("1%"));
    }

    #[test]
    fn spinner_cycles_frames() {
        let out = Shared::default();
        let spinner = ProgressSpinner::with_writer(out.clone());
        spinner.set_text("waiting");
        for _ in 0..4 {
            assert!(spinner.tick());
        }
        let text = out.text();
        for frame in SPINNER_FRAMES {
            assert!(text.contains(&format!("{} waiting", frame)));
        }
    }
}
