//! Emulated CPU ticks to host sample mapping
//!
//! Port writes arrive timestamped in CPU ticks; the host audio device wants a
//! fixed number of samples per second. [`SampleClock`] converts the tick gap
//! between two writes into a whole sample count and carries the fractional
//! remainder forward so the long-run rate converges on the true ratio.

/// Default drift correction applied on top of the nominal rate ratio
pub const DEFAULT_DRIFT_CORRECTION: f64 = 1.0247;

/// Rate ratio between emulated CPU ticks and host samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    /// Host output sample rate in Hz
    pub sample_rate: u32,
    /// Multiplier compensating for host/emulator clock mismatch
    pub drift_correction: f64,
}

impl SampleClock {
    /// Create a mapper with the default drift correction.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            drift_correction: DEFAULT_DRIFT_CORRECTION,
        }
    }

    /// Override the drift correction factor.
    pub fn with_drift_correction(mut self, drift_correction: f64) -> Self {
        self.drift_correction = drift_correction;
        self
    }

    /// Samples per CPU tick at the given CPU frequency.
    #[inline]
    pub fn ratio(&self, cpu_hz: u64) -> f64 {
        if cpu_hz == 0 {
            return 0.0;
        }
        self.sample_rate as f64 / cpu_hz as f64 * self.drift_correction
    }
}

/// Per-channel timing memory between port writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTimingState {
    /// Tick of the previous write, `None` until the first write
    pub last_tick: Option<u64>,
    /// Level written by the previous write
    pub last_level: i8,
    /// Accumulated fractional sample error, always in `[0, 1)`
    pub error: f64,
}

impl ChannelTimingState {
    /// Fresh power-on state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples owed since the previous write.
    ///
    /// The first write seeds the timestamp and owes nothing. A clock that
    /// moved backwards is treated as zero elapsed time.
    pub fn samples_since_last(&mut self, now: u64, ratio: f64) -> usize {
        let last = *self.last_tick.get_or_insert(now);
        self.last_tick = Some(now);

        let raw = now.saturating_sub(last) as f64 * ratio;
        let whole = raw.floor();
        let mut count = whole as usize;

        self.error += raw - whole;
        if self.error >= 1.0 {
            count += 1;
            self.error -= 1.0;
        }
        count
    }

    /// Reset to power-on state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
