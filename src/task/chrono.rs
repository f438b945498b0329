use std::time::{Duration, Instant};

/// Stopwatch that can be paused without losing the accumulated time.
#[derive(Debug, Default)]
pub struct Chrono {
    started: Option<Instant>,
    accumulated: Duration,
}

impl Chrono {
    /// Starts from zero.
    pub fn run(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started = Some(Instant::now());
    }

    pub fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) -> Duration {
        self.pause();
        self.accumulated
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.accumulated + started.elapsed(),
            None => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn paused_time_is_not_counted() {
        let mut chrono = Chrono::default();
        chrono.run();
        thread::sleep(Duration::from_millis(10));
        chrono.pause();
        let at_pause = chrono.elapsed();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(chrono.elapsed(), at_pause);
        chrono.resume();
        let total = chrono.stop();
        assert!(total >= at_pause);
        assert!(total >= Duration::from_millis(10));
    }

    #[test]
    fn reset_clears_accumulated_time() {
        let mut chrono = Chrono::default();
        chrono.run();
        thread::sleep(Duration::from_millis(2));
        chrono.stop();
        chrono.reset();
        assert_eq!(chrono.elapsed(), Duration::ZERO);
    }
}
