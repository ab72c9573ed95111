//! Real-time pacing against the emulated CPU clock
//!
//! Scan-out can hold the beam at the pace of the emulated CPU: wait until the
//! CPU clock passes a deadline, sleeping in the shortest quantum the host
//! offers, and give up as soon as the CPU leaves continuous run.

use crate::bus::CpuClock;
use std::sync::Arc;
use std::time::Duration;

/// Sleeps used while pacing
pub trait Sleeper: Send + Sync {
    /// Sleep for roughly `micros` microseconds.
    fn sleep_us(&self, micros: u64);
}

/// [`Sleeper`] backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_us(&self, micros: u64) {
        std::thread::sleep(Duration::from_micros(micros));
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The clock reached the deadline
    Reached,
    /// The CPU stopped running first
    Aborted,
}

/// Sleeps until an emulated tick deadline
#[derive(Clone)]
pub struct TickPacer {
    sleeper: Arc<dyn Sleeper>,
    slack_ticks: u64,
}

/// Sleeps measured by [`TickPacer::calibrate`]
const CALIBRATION_SLEEPS: u64 = 1000;

impl TickPacer {
    /// Create an uncalibrated pacer (no slack)
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sleeper,
            slack_ticks: 0,
        }
    }

    /// Measure how many CPU ticks pass during one shortest sleep.
    ///
    /// The result is used as slack: row waits stop that many ticks early so
    /// the final sleep does not overshoot the deadline.
    pub fn calibrate(&mut self, clock: &dyn CpuClock) -> u64 {
        let start = clock.ticks();
        for _ in 0..CALIBRATION_SLEEPS {
            self.sleeper.sleep_us(1);
        }
        self.slack_ticks = clock.ticks().saturating_sub(start) / CALIBRATION_SLEEPS;
        log::debug!("pacer calibrated: {} ticks per sleep", self.slack_ticks);
        self.slack_ticks
    }

    /// Ticks per shortest sleep, as measured by the last calibration
    pub fn slack_ticks(&self) -> u64 {
        self.slack_ticks
    }

    /// Override the slack (for hosts with a known sleep granularity)
    pub fn set_slack_ticks(&mut self, slack: u64) {
        self.slack_ticks = slack;
    }

    /// Sleep until `clock` reaches `deadline` or stops running.
    pub fn wait_until(&self, clock: &dyn CpuClock, deadline: u64) -> WaitOutcome {
        loop {
            if clock.ticks() >= deadline {
                return WaitOutcome::Reached;
            }
            if !clock.is_running() {
                return WaitOutcome::Aborted;
            }
            self.sleeper.sleep_us(1);
        }
    }

    /// Wait for the end of a row, stopping one sleep early.
    pub fn wait_row(&self, clock: &dyn CpuClock, deadline: u64) -> WaitOutcome {
        self.wait_until(clock, deadline.saturating_sub(self.slack_ticks))
    }

    /// Wait `micros` microseconds of emulated time.
    pub fn wait_emulated_us(&self, clock: &dyn CpuClock, micros: u64) -> WaitOutcome {
        let ticks = clock.frequency_hz() * micros / 1_000_000;
        self.wait_until(clock, clock.ticks() + ticks)
    }
}

impl std::fmt::Debug for TickPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickPacer")
            .field("slack_ticks", &self.slack_ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bus::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Sleeper that advances a manual clock instead of sleeping
    pub(crate) struct AdvancingSleeper {
        pub(crate) clock: Arc<ManualClock>,
        pub(crate) ticks_per_sleep: u64,
        pub(crate) sleeps: AtomicU64,
    }

    impl AdvancingSleeper {
        pub(crate) fn new(clock: Arc<ManualClock>, ticks_per_sleep: u64) -> Self {
            Self {
                clock,
                ticks_per_sleep,
                sleeps: AtomicU64::new(0),
            }
        }
    }

    impl Sleeper for AdvancingSleeper {
        fn sleep_us(&self, _micros: u64) {
            self.sleeps.fetch_add(1, Ordering::Relaxed);
            self.clock.advance(self.ticks_per_sleep);
        }
    }

    #[test]
    fn test_calibrate_measures_ticks_per_sleep() {
        let clock = Arc::new(ManualClock::new(4_000_000));
        let sleeper = Arc::new(AdvancingSleeper::new(clock.clone(), 7));
        let mut pacer = TickPacer::new(sleeper);
        assert_eq!(pacer.calibrate(clock.as_ref()), 7);
        assert_eq!(pacer.slack_ticks(), 7);
    }

    #[test]
    fn test_wait_until_reaches_deadline() {
        let clock = Arc::new(ManualClock::new(4_000_000));
        let sleeper = Arc::new(AdvancingSleeper::new(clock.clone(), 10));
        let pacer = TickPacer::new(sleeper.clone());

        assert_eq!(pacer.wait_until(clock.as_ref(), 95), WaitOutcome::Reached);
        assert_eq!(clock.ticks(), 100);
        assert_eq!(sleeper.sleeps.load(Ordering::Relaxed), 10);

        // Deadline already passed: no sleep
        assert_eq!(pacer.wait_until(clock.as_ref(), 50), WaitOutcome::Reached);
        assert_eq!(sleeper.sleeps.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_wait_aborts_when_cpu_stops() {
        let clock = Arc::new(ManualClock::new(4_000_000));
        clock.set_running(false);
        let sleeper = Arc::new(AdvancingSleeper::new(clock.clone(), 10));
        let pacer = TickPacer::new(sleeper.clone());

        assert_eq!(pacer.wait_until(clock.as_ref(), 1000), WaitOutcome::Aborted);
        assert_eq!(sleeper.sleeps.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_row_wait_uses_slack() {
        let clock = Arc::new(ManualClock::new(4_000_000));
        let sleeper = Arc::new(AdvancingSleeper::new(clock.clone(), 10));
        let mut pacer = TickPacer::new(sleeper);
        pacer.set_slack_ticks(30);

        assert_eq!(pacer.wait_row(clock.as_ref(), 100), WaitOutcome::Reached);
        assert_eq!(clock.ticks(), 70);
    }

    #[test]
    fn test_wait_emulated_time() {
        let clock = Arc::new(ManualClock::new(2_000_000));
        let sleeper = Arc::new(AdvancingSleeper::new(clock.clone(), 1000));
        let pacer = TickPacer::new(sleeper);
        // 4 ms at 2 MHz = 8000 ticks
        assert_eq!(pacer.wait_emulated_us(clock.as_ref(), 4000), WaitOutcome::Reached);
        assert_eq!(clock.ticks(), 8000);
    }
}
