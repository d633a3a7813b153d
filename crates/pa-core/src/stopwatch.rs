//! Start/stop/reset duration tracking.
//!
//! A [`Stopwatch`] is a plain state machine over readings from a
//! [`Clock`](crate::clock::Clock): callers pass the current time into every
//! transition, so the stopwatch itself never blocks or reads global state.

use std::time::Duration;

/// Accumulates elapsed time across start/stop cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    /// Clock reading at the last `start`, while running.
    started_at: Option<Duration>,
    /// Time accumulated by completed start/stop cycles.
    accumulated: Duration,
}

impl Stopwatch {
    pub const fn new() -> Self {
        Self {
            started_at: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Starts accumulating. Starting a running stopwatch does nothing.
    pub const fn start(&mut self, now: Duration) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Freezes the elapsed time. Stopping a stopped stopwatch does nothing.
    pub fn stop(&mut self, now: Duration) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += now.saturating_sub(started_at);
        }
    }

    /// Zeroes the elapsed time and clears the running state.
    pub const fn reset(&mut self) {
        self.started_at = None;
        self.accumulated = Duration::ZERO;
    }

    pub const fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Elapsed time as of `now`: live while running, frozen once stopped.
    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + now.saturating_sub(started_at),
            None => self.accumulated,
        }
    }

    /// [`elapsed`](Self::elapsed) in fractional seconds.
    pub fn elapsed_secs(&self, now: Duration) -> f64 {
        self.elapsed(now).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn new_stopwatch_reads_zero() {
        let sw = Stopwatch::new();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(secs(10.0)), Duration::ZERO);
    }

    #[test]
    fn running_stopwatch_reports_live_duration() {
        let mut sw = Stopwatch::new();
        sw.start(secs(1.0));
        assert_eq!(sw.elapsed(secs(1.5)), secs(0.5));
        assert_eq!(sw.elapsed(secs(3.0)), secs(2.0));
    }

    #[test]
    fn stop_freezes_elapsed() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        sw.stop(secs(2.0));
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(secs(100.0)), secs(2.0));
    }

    #[test]
    fn start_is_idempotent() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        sw.start(secs(5.0));
        assert_eq!(sw.elapsed(secs(6.0)), secs(6.0));
    }

    #[test]
    fn restart_accumulates_like_a_stopwatch() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        sw.stop(secs(1.0));
        sw.start(secs(10.0));
        sw.stop(secs(12.0));
        assert_eq!(sw.elapsed(secs(20.0)), secs(3.0));
    }

    #[test]
    fn reset_after_stop_zeroes_state() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        sw.stop(secs(4.0));
        sw.reset();
        assert_eq!(sw, Stopwatch::new());
        assert_eq!(sw.elapsed(secs(9.0)), Duration::ZERO);
    }

    #[test]
    fn reset_while_running_stops() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        sw.reset();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed(secs(5.0)), Duration::ZERO);
    }

    #[test]
    fn stop_and_reset_without_start_are_no_ops() {
        let mut sw = Stopwatch::new();
        sw.stop(secs(3.0));
        sw.reset();
        assert_eq!(sw, Stopwatch::new());
    }

    #[test]
    fn elapsed_is_monotonic_between_start_and_stop() {
        let mut sw = Stopwatch::new();
        sw.start(secs(0.0));
        let mut last = Duration::ZERO;
        for step in 1..=20 {
            let reading = sw.elapsed(secs(f64::from(step) * 0.25));
            assert!(reading >= last);
            last = reading;
        }
        sw.stop(secs(5.0));
        assert!(sw.elapsed(secs(6.0)) >= last);
    }

    #[test]
    fn clock_going_backwards_saturates() {
        let mut sw = Stopwatch::new();
        sw.start(secs(5.0));
        assert_eq!(sw.elapsed(secs(4.0)), Duration::ZERO);
    }
}
