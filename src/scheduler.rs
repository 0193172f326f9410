//! # Measurement Scheduler
//!
//! Decides when the next measurement cycle fires. The scheduler never reads
//! a clock itself; the runtime passes the current time in, which keeps the
//! cadence logic trivially testable with fake seconds.
//!
//! Two properties matter for a battery-powered gauge:
//! - The first check after startup always fires, so a rebooted gauge reports
//!   immediately instead of waiting out a full interval.
//! - Re-arming is relative to the time a cycle actually fires. If the loop
//!   stalls (slow sensor, long retry run, suspended process), the schedule
//!   slips forward; missed intervals are never back-filled with a burst.

/// Interval state machine for the measurement loop.
#[derive(Debug)]
pub struct CycleScheduler {
    interval_s: u64,
    next_due_s: Option<u64>,
}

impl CycleScheduler {
    /// Create a scheduler that fires every `interval_s` seconds.
    pub fn new(interval_s: u64) -> Self {
        CycleScheduler {
            interval_s,
            next_due_s: None,
        }
    }

    /// Check whether a cycle should fire at `now_s`.
    ///
    /// Firing re-arms the deadline to `now_s + interval`, so the answer
    /// depends on call history as well as the clock.
    pub fn is_due(&mut self, now_s: u64) -> bool {
        match self.next_due_s {
            Some(due_s) if now_s < due_s => false,
            _ => {
                self.next_due_s = Some(now_s + self.interval_s);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_always_fires() {
        let mut scheduler = CycleScheduler::new(60);
        assert!(scheduler.is_due(0));
    }

    #[test]
    fn test_interval_timeline() {
        let mut scheduler = CycleScheduler::new(60);
        let expected = [
            (0, true),
            (0, false),
            (59, false),
            (60, true),
            (119, false),
            (120, true),
        ];
        for (now_s, fires) in expected {
            assert_eq!(scheduler.is_due(now_s), fires, "at t={now_s}");
        }
    }

    #[test]
    fn test_first_fire_arms_from_current_time() {
        let mut scheduler = CycleScheduler::new(60);
        assert!(scheduler.is_due(1000));
        assert!(!scheduler.is_due(1059));
        assert!(scheduler.is_due(1060));
    }

    #[test]
    fn test_missed_intervals_are_not_backfilled() {
        let mut scheduler = CycleScheduler::new(60);
        assert!(scheduler.is_due(0));
        // Long stall: the next fire re-arms from the firing time, so only
        // one cycle runs and the cadence continues from there.
        assert!(scheduler.is_due(600));
        assert!(!scheduler.is_due(630));
        assert!(!scheduler.is_due(659));
        assert!(scheduler.is_due(660));
    }

    #[test]
    fn test_zero_interval_fires_every_check() {
        let mut scheduler = CycleScheduler::new(0);
        assert!(scheduler.is_due(5));
        assert!(scheduler.is_due(5));
        assert!(scheduler.is_due(6));
    }
}
