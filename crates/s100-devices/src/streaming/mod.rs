//! Real-time audio streaming
//!
//! Port writes from the CPU thread are turned into samples and queued in
//! per-channel rings; the host audio thread drains them on its own schedule.
//!
//! - [`RingBuffer`]: fixed-capacity sample queue
//! - [`interpolator`]: fills the gap between two writes
//! - [`AudioPipe`]: guarded producer/consumer pair with fault counters
//! - `AudioDevice` (feature `streaming`): rodio output fed by an
//!   [`AudioCallbacks`](crate::host::AudioCallbacks) implementation

mod bridge;
pub mod interpolator;
pub mod pipe;
pub mod ring_buffer;

#[cfg(feature = "streaming")]
pub mod audio_device;

pub use interpolator::{AppendKind, AppendReport, InterpolationPolicy};
pub use pipe::{AudioPipe, FaultStats, WriteOutcome};
pub use ring_buffer::{RingBuffer, RingBufferError};

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;

use crate::clock::{SampleClock, DEFAULT_DRIFT_CORRECTION};
use crate::{DeviceError, Result};
use std::time::Duration;

/// Default ring capacity per channel (in samples)
pub const DEFAULT_RING_CAPACITY: usize = 4048;

/// Default time the producer waits for the guard
pub const DEFAULT_GUARD_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for a DAC audio pipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Size of each channel ring (in samples)
    pub ring_capacity: usize,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Number of audio channels
    pub channels: u16,

    /// Multiplier applied to the tick/sample ratio
    pub drift_correction: f64,

    /// Gap filling thresholds
    pub policy: InterpolationPolicy,

    /// Longest time a producer write waits for the guard
    pub guard_timeout: Duration,
}

impl StreamConfig {
    /// Stereo DAC configuration at the given sample rate
    pub fn stereo(sample_rate: u32) -> Self {
        StreamConfig {
            ring_capacity: DEFAULT_RING_CAPACITY,
            sample_rate,
            channels: 2,
            drift_correction: DEFAULT_DRIFT_CORRECTION,
            policy: InterpolationPolicy::default(),
            guard_timeout: DEFAULT_GUARD_TIMEOUT,
        }
    }

    /// Sample clock derived from this configuration.
    pub fn clock(&self) -> SampleClock {
        SampleClock::new(self.sample_rate).with_drift_correction(self.drift_correction)
    }

    /// Worst-case queueing latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        ((self.ring_capacity as f32) / (self.sample_rate as f32)) * 1000.0
    }

    /// Reject configurations the pipe cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(DeviceError::Config("at least one channel required".into()));
        }
        if self.ring_capacity == 0 {
            return Err(DeviceError::Config("ring capacity must be > 0".into()));
        }
        if self.sample_rate == 0 {
            return Err(DeviceError::Config("sample rate must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stereo(22_050)
    }
}
