//! Game clock with stop/resume accumulation and a one-shot expiry.

use std::time::Duration;

use crate::config::TimerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    /// The limit was reached. Only `reset` or `start` leave this phase.
    Ended,
}

/// Result of polling the timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerPoll {
    /// New display text, when a refresh was due.
    pub display: Option<String>,
    /// Set on the single poll that crossed the limit.
    pub expired: bool,
}

/// Formats elapsed time as `Time: SS:CC` (seconds and centiseconds).
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let centis = elapsed.subsec_millis() / 10;
    format!("Time: {seconds:02}:{centis:02}")
}

#[derive(Debug, Clone)]
pub struct TimerController {
    phase: TimerPhase,
    /// Elapsed time frozen at the last stop.
    accumulated: Duration,
    /// Clock time that corresponds to zero elapsed while running.
    origin: Duration,
    limit: Option<Duration>,
    refresh: Duration,
    last_emit: Option<Duration>,
}

impl TimerController {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            phase: TimerPhase::Idle,
            accumulated: Duration::ZERO,
            origin: Duration::ZERO,
            limit: config.limit_ms.map(Duration::from_millis),
            refresh: Duration::from_millis(config.refresh_ms),
            last_emit: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// Starts or resumes. Returns `false` if already running.
    ///
    /// Resuming keeps the accumulated time; starting after expiry begins
    /// again from zero.
    pub fn start(&mut self, now: Duration) -> bool {
        match self.phase {
            TimerPhase::Running => return false,
            TimerPhase::Ended => self.accumulated = Duration::ZERO,
            TimerPhase::Idle => {}
        }
        self.origin = now.saturating_sub(self.accumulated);
        self.last_emit = None;
        self.phase = TimerPhase::Running;
        true
    }

    /// Freezes elapsed time. Returns `false` if not running.
    pub fn stop(&mut self, now: Duration) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.accumulated = now.saturating_sub(self.origin);
        self.phase = TimerPhase::Idle;
        true
    }

    /// Stops and zeroes the clock. Returns the zero display text.
    pub fn reset(&mut self) -> String {
        self.phase = TimerPhase::Idle;
        self.accumulated = Duration::ZERO;
        self.origin = Duration::ZERO;
        self.last_emit = None;
        format_elapsed(Duration::ZERO)
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.phase {
            TimerPhase::Running => now.saturating_sub(self.origin),
            TimerPhase::Idle | TimerPhase::Ended => self.accumulated,
        }
    }

    /// Refreshes the display and checks the limit.
    ///
    /// On the poll that crosses the limit the timer freezes at exactly the
    /// limit, moves to `Ended` and reports `expired`; later polls report
    /// nothing.
    pub fn poll(&mut self, now: Duration) -> TimerPoll {
        if self.phase != TimerPhase::Running {
            return TimerPoll::default();
        }
        let elapsed = now.saturating_sub(self.origin);

        if let Some(limit) = self.limit {
            if elapsed >= limit {
                self.accumulated = limit;
                self.phase = TimerPhase::Ended;
                self.last_emit = Some(now);
                tracing::info!(?limit, "timer expired");
                return TimerPoll {
                    display: Some(format_elapsed(limit)),
                    expired: true,
                };
            }
        }

        let due = self
            .last_emit
            .is_none_or(|last| now.saturating_sub(last) >= self.refresh);
        if !due {
            return TimerPoll::default();
        }
        self.last_emit = Some(now);
        TimerPoll {
            display: Some(format_elapsed(elapsed)),
            expired: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn timer(limit_ms: Option<u64>) -> TimerController {
        TimerController::new(&TimerConfig {
            limit_ms,
            refresh_ms: 10,
        })
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "Time: 00:00");
        assert_eq!(format_elapsed(ms(1_234)), "Time: 01:23");
        assert_eq!(format_elapsed(ms(59_999)), "Time: 59:99");
        assert_eq!(format_elapsed(ms(125_000)), "Time: 125:00");
    }

    #[test]
    fn test_elapsed_runs_and_freezes() {
        let mut t = timer(None);
        assert!(t.start(ms(1_000)));
        assert_eq!(t.elapsed(ms(1_500)), ms(500));

        assert!(t.stop(ms(2_000)));
        assert_eq!(t.elapsed(ms(9_000)), ms(1_000));
    }

    #[test]
    fn test_resume_accumulates() {
        let mut t = timer(None);
        t.start(Duration::ZERO);
        t.stop(ms(700));
        t.start(ms(5_000));
        assert_eq!(t.elapsed(ms(5_300)), ms(1_000));
    }

    #[test]
    fn test_double_start_and_stop_are_noops() {
        let mut t = timer(None);
        assert!(t.start(Duration::ZERO));
        assert!(!t.start(ms(400)));
        assert_eq!(t.elapsed(ms(500)), ms(500));

        assert!(t.stop(ms(600)));
        assert!(!t.stop(ms(900)));
        assert_eq!(t.elapsed(ms(900)), ms(600));
    }

    #[test]
    fn test_reset_zeroes() {
        let mut t = timer(None);
        t.start(Duration::ZERO);
        assert_eq!(t.reset(), "Time: 00:00");
        assert_eq!(t.elapsed(ms(3_000)), Duration::ZERO);
        assert!(!t.is_running());
    }

    #[test]
    fn test_refresh_respects_period() {
        let mut t = timer(None);
        t.start(Duration::ZERO);
        assert!(t.poll(ms(0)).display.is_some());
        assert!(t.poll(ms(5)).display.is_none());
        assert_eq!(t.poll(ms(10)).display.as_deref(), Some("Time: 00:01"));
    }

    #[test]
    fn test_expiry_fires_once() {
        let mut t = timer(Some(60_000));
        t.start(Duration::ZERO);

        let mut expired = 0;
        for step in 0..4_000 {
            if t.poll(ms(step * 16)).expired {
                expired += 1;
            }
        }

        assert_eq!(expired, 1);
        assert_eq!(t.phase(), TimerPhase::Ended);
        assert_eq!(t.elapsed(ms(100_000)), ms(60_000));
    }

    #[test]
    fn test_no_expiry_when_stopped() {
        let mut t = timer(Some(1_000));
        t.start(Duration::ZERO);
        t.stop(ms(500));
        assert_eq!(t.poll(ms(5_000)), TimerPoll::default());
    }

    #[test]
    fn test_start_after_expiry_begins_at_zero() {
        let mut t = timer(Some(1_000));
        t.start(Duration::ZERO);
        assert!(t.poll(ms(1_000)).expired);

        assert!(t.start(ms(2_000)));
        assert_eq!(t.elapsed(ms(2_250)), ms(250));
    }
}
