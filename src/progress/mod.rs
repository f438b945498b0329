//! Progress reporters ticked by composite tasks after each finished child.

pub mod console;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use console::{ProgressBar, ProgressPercent, ProgressSpinner};

/// Receives a tick for every finished unit of work.
pub trait Progress: Send + Sync {
    /// Advances by `increment` units. Returns `false` once the maximum has
    /// been reached.
    fn advance(&self, increment: usize) -> bool;

    fn tick(&self) -> bool {
        self.advance(1)
    }

    fn set_range(&self, _minimum: usize, _maximum: usize) {}

    fn set_text(&self, _text: &str) {}

    fn reset(&self) {}
}

/// Counts ticks and renders nothing.
#[derive(Debug, Default)]
pub struct CountingProgress {
    count: AtomicUsize,
}

impl CountingProgress {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Progress for CountingProgress {
    fn advance(&self, increment: usize) -> bool {
        self.count.fetch_add(increment, Ordering::SeqCst);
        true
    }

    fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

/// Position within a range, tracked as a whole percentage.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressState {
    minimum: usize,
    maximum: usize,
    value: usize,
    text: String,
    percent: Option<u8>,
}

impl ProgressState {
    pub(crate) fn new(minimum: usize, maximum: usize) -> Self {
        Self {
            minimum,
            maximum,
            value: minimum,
            ..Self::default()
        }
    }

    /// Advances and returns the new percentage when it changed.
    pub(crate) fn advance(&mut self, increment: usize) -> Option<u8> {
        self.value = self.value.saturating_add(increment).min(self.maximum.max(self.minimum));
        let percent = self.compute_percent();
        if self.percent == Some(percent) {
            return None;
        }
        self.percent = Some(percent);
        Some(percent)
    }

    fn compute_percent(&self) -> u8 {
        let span = self.maximum.saturating_sub(self.minimum);
        if span == 0 {
            return 100;
        }
        let done = self.value.saturating_sub(self.minimum) as u128;
        ((done * 100) / span as u128).min(100) as u8
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.value >= self.maximum
    }

    pub(crate) fn set_range(&mut self, minimum: usize, maximum: usize) {
        *self = Self {
            text: std::mem::take(&mut self.text),
            ..Self::new(minimum, maximum)
        };
    }

    pub(crate) fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn reset(&mut self) {
        self.set_range(self.minimum, self.maximum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_changes_are_reported_once() {
        let mut state = ProgressState::new(0, 4);
        assert_eq!(state.advance(1), Some(25));
        assert_eq!(state.advance(0), None);
        assert_eq!(state.advance(3), Some(100));
        assert!(state.is_complete());
    }

    #[test]
    fn advancing_past_the_end_is_clamped() {
        let mut state = ProgressState::new(10, 20);
        assert_eq!(state.advance(50), Some(100));
        assert_eq!(state.advance(1), None);
    }

    #[test]
    fn huge_ranges_do_not_overflow() {
        let mut state = ProgressState::new(0, usize::MAX);
        assert_eq!(state.advance(usize::MAX / 2), Some(49));
        assert_eq!(state.advance(usize::MAX), Some(100));
    }

    #[test]
    fn empty_range_is_complete() {
        let mut state = ProgressState::new(0, 0);
        assert_eq!(state.advance(1), Some(100));
    }

    #[test]
    fn counting_progress_counts_ticks() {
        let progress = CountingProgress::default();
        progress.tick();
        progress.advance(4);
        assert_eq!(progress.count(), 5);
        progress.reset();
        assert_eq!(progress.count(), 0);
    }
}
