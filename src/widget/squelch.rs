//! Feedback squelch for motorised controls
//!
//! Suppresses outgoing feedback for a short window after the user moved the
//! control, so the motor does not fight the hand and the host's echo does not
//! jitter the fader. Only widgets configured as `motorized` carry a window;
//! everything else uses [`FeedbackSquelch::disabled`].

use std::time::{Duration, Instant};

/// Default squelch window
pub const DEFAULT_SQUELCH_MS: u64 = 250;

/// Per-widget squelch window keyed on the last input time
#[derive(Debug, Clone, Copy)]
pub struct FeedbackSquelch {
    window: Duration,
    /// Suppress feedback until this instant
    until: Option<Instant>,
}

impl FeedbackSquelch {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    /// Zero-length window: inputs are recorded but never hold feedback back
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Record an input; extends the window, never shortens it
    pub fn mark_input(&mut self, now: Instant) {
        let target = now + self.window;
        self.until = Some(self.until.map_or(target, |u| u.max(target)));
    }

    pub fn is_squelched(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    pub fn last_input(&self) -> Option<Instant> {
        self.until.map(|u| u - self.window)
    }

    /// End the current window early
    pub fn reset(&mut self) {
        if let Some(last) = self.last_input() {
            self.until = Some(last);
        }
    }
}

impl Default for FeedbackSquelch {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SQUELCH_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squelch_basic() {
        let mut squelch = FeedbackSquelch::new(Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(!squelch.is_squelched(t0));

        squelch.mark_input(t0);
        assert!(squelch.is_squelched(t0 + Duration::from_millis(50)));
        assert!(!squelch.is_squelched(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_squelch_extends_window() {
        let mut squelch = FeedbackSquelch::new(Duration::from_millis(100));
        let t0 = Instant::now();

        squelch.mark_input(t0 + Duration::from_millis(30));
        squelch.mark_input(t0);
        // Earlier input does not shorten the window
        assert!(squelch.is_squelched(t0 + Duration::from_millis(120)));
        assert!(!squelch.is_squelched(t0 + Duration::from_millis(131)));
    }

    #[test]
    fn test_squelch_reset_keeps_last_input() {
        let mut squelch = FeedbackSquelch::new(Duration::from_millis(100));
        let t0 = Instant::now();
        squelch.mark_input(t0);
        squelch.reset();
        assert!(!squelch.is_squelched(t0 + Duration::from_millis(10)));
        assert_eq!(squelch.last_input(), Some(t0));
    }

    #[test]
    fn test_squelch_zero_duration() {
        let mut squelch = FeedbackSquelch::new(Duration::ZERO);
        let t0 = Instant::now();
        squelch.mark_input(t0);
        assert!(!squelch.is_squelched(t0));
    }
}
