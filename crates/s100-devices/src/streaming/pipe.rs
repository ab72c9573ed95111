//! Guarded producer/consumer audio pipe
//!
//! The CPU thread writes DAC levels with [`AudioPipe::write`]; the host audio
//! thread pulls frames with [`AudioPipe::render`]. Both sides share one guard
//! over the whole ring set:
//! - the producer waits at most `guard_timeout` and drops the write on expiry
//! - the consumer never waits; a busy guard yields a buffer of silence
//!
//! Fault counters are atomics so they can be read without the guard.

use super::bridge;
use super::interpolator::{append_interval_observed, AppendReport};
use super::{RingBuffer, StreamConfig};
use crate::clock::ChannelTimingState;
use crate::recording::{RecordEntry, Recorder, SampleStatus};
use crate::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the audio fault counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FaultStats {
    /// Writes that found their ring empty
    pub underflows: u64,
    /// Writes that had samples dropped for lack of space
    pub overflows: u64,
    /// Writes whose gap was filled with silence
    pub dropouts: u64,
    /// Writes dropped because the guard stayed busy
    pub timeouts: u64,
}

impl fmt::Display for FaultStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "underflows: {} overflows: {} dropouts: {} timeouts: {}",
            self.underflows, self.overflows, self.dropouts, self.timeouts
        )
    }
}

#[derive(Debug, Default)]
struct FaultCounters {
    underflows: AtomicU64,
    overflows: AtomicU64,
    dropouts: AtomicU64,
    timeouts: AtomicU64,
}

impl FaultCounters {
    fn snapshot(&self) -> FaultStats {
        FaultStats {
            underflows: self.underflows.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            dropouts: self.dropouts.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.underflows.store(0, Ordering::Relaxed);
        self.overflows.store(0, Ordering::Relaxed);
        self.dropouts.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
    }
}

/// State shared by producer and consumer, behind the guard
#[derive(Debug)]
pub(crate) struct RingSet {
    pub(crate) channels: Vec<RingBuffer<i8>>,
    /// Startup padding has been applied since the rings were last empty
    pub(crate) primed: bool,
}

/// Producer-only state
#[derive(Debug)]
struct ProducerState {
    timing: Vec<ChannelTimingState>,
    recorder: Option<Recorder>,
}

/// Result of one producer write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Samples were queued (possibly clamped)
    Queued(AppendReport),
    /// The guard could not be acquired in time; nothing was queued
    TimedOut,
    /// The channel index does not exist
    NoSuchChannel,
}

/// Multi-channel DAC audio pipe
pub struct AudioPipe {
    config: StreamConfig,
    rings: Mutex<RingSet>,
    producer: Mutex<ProducerState>,
    faults: FaultCounters,
}

impl AudioPipe {
    /// Create a pipe with one ring per configured channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration has no channels or a zero ring
    /// capacity.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let channels = (0..config.channels)
            .map(|_| RingBuffer::new(config.ring_capacity))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            rings: Mutex::new(RingSet {
                channels,
                primed: false,
            }),
            producer: Mutex::new(ProducerState {
                timing: vec![ChannelTimingState::new(); config.channels as usize],
                recorder: None,
            }),
            faults: FaultCounters::default(),
            config,
        })
    }

    /// Pipe configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Attach a recorder; every queued sample is logged from now on.
    pub fn attach_recorder(&self, recorder: Recorder) {
        self.producer.lock().recorder = Some(recorder);
    }

    /// Detach and return the recorder.
    pub fn take_recorder(&self) -> Option<Recorder> {
        self.producer.lock().recorder.take()
    }

    /// Queue the samples owed since the previous write on `channel`.
    ///
    /// `now` is the emulated tick of this write and `cpu_hz` the CPU
    /// frequency used to map ticks to samples.
    pub fn write(&self, channel: usize, now: u64, cpu_hz: u64, level: i8) -> WriteOutcome {
        let mut producer = self.producer.lock();
        let ProducerState { timing, recorder } = &mut *producer;
        let Some(state) = timing.get_mut(channel) else {
            return WriteOutcome::NoSuchChannel;
        };

        let count = state.samples_since_last(now, self.config.clock().ratio(cpu_hz));
        let last = state.last_level;

        let Some(mut rings) = self.rings.try_lock_for(self.config.guard_timeout) else {
            self.faults.timeouts.fetch_add(1, Ordering::Relaxed);
            if let Some(rec) = recorder.as_mut() {
                rec.mark_last(channel, SampleStatus::Timeout);
            }
            log::trace!("channel {channel}: guard timeout, write dropped");
            return WriteOutcome::TimedOut;
        };

        let report = append_interval_observed(
            &mut rings.channels[channel],
            count,
            last,
            level,
            self.config.policy,
            |sample, occupancy| {
                if let Some(rec) = recorder.as_mut() {
                    rec.record(
                        channel,
                        RecordEntry {
                            tick: now,
                            occupancy: occupancy as u32,
                            sample: i16::from(sample) * 256,
                            status: SampleStatus::Ok,
                        },
                    );
                }
            },
        );
        drop(rings);

        let status = if report.overflow {
            self.faults.overflows.fetch_add(1, Ordering::Relaxed);
            SampleStatus::Overflow
        } else if report.dropout {
            self.faults.dropouts.fetch_add(1, Ordering::Relaxed);
            SampleStatus::Dropout
        } else {
            SampleStatus::Ok
        };
        if report.underflow {
            self.faults.underflows.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(rec) = recorder.as_mut() {
            match (status, report.underflow) {
                (SampleStatus::Ok, true) if report.appended > 0 => {
                    rec.mark_last(channel, SampleStatus::Underflow)
                }
                (SampleStatus::Ok, _) => {}
                (status, _) => rec.mark_last(channel, status),
            }
        }

        state.last_level = level;
        WriteOutcome::Queued(report)
    }

    /// Fill `out` with interleaved frames for the host device.
    ///
    /// Never blocks: if the producer holds the guard the whole buffer is
    /// silence. Never allocates.
    pub fn render(&self, out: &mut [f32]) {
        match self.rings.try_lock() {
            Some(mut rings) => bridge::drain_into(&mut rings, out),
            None => out.fill(0.0),
        }
    }

    /// Queued samples on `channel`.
    pub fn occupancy(&self, channel: usize) -> usize {
        self.rings
            .lock()
            .channels
            .get(channel)
            .map_or(0, RingBuffer::len)
    }

    /// Current fault counters.
    pub fn stats(&self) -> FaultStats {
        self.faults.snapshot()
    }

    /// Drop queued audio and restore power-on timing; counters are cleared.
    pub fn reset(&self) {
        let mut producer = self.producer.lock();
        producer.timing.iter_mut().for_each(ChannelTimingState::reset);
        let mut rings = self.rings.lock();
        rings.channels.iter_mut().for_each(RingBuffer::clear);
        rings.primed = false;
        self.faults.reset();
    }

    /// Hold the guard, simulating a consumer that is mid-callback.
    #[cfg(test)]
    pub(crate) fn hold_guard(&self) -> parking_lot::MutexGuard<'_, RingSet> {
        self.rings.lock()
    }
}

impl fmt::Debug for AudioPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPipe")
            .field("config", &self.config)
            .field("faults", &self.faults.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CPU_HZ: u64 = 4_000_000;

    fn pipe(capacity: usize) -> AudioPipe {
        // 20 kHz at 4 MHz without drift correction: one sample per 200 ticks
        let config = StreamConfig {
            ring_capacity: capacity,
            sample_rate: 20_000,
            drift_correction: 1.0,
            guard_timeout: Duration::from_millis(1),
            ..StreamConfig::default()
        };
        AudioPipe::new(config).expect("pipe")
    }

    #[test]
    fn test_first_write_queues_nothing() {
        let pipe = pipe(64);
        let outcome = pipe.write(0, 10_000, CPU_HZ, 40);
        match outcome {
            WriteOutcome::Queued(report) => assert_eq!(report.appended, 0),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(pipe.occupancy(0), 0);
    }

    #[test]
    fn test_write_queues_owed_samples() {
        let pipe = pipe(64);
        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200, CPU_HZ, 10);
        pipe.write(0, 800, CPU_HZ, 40);
        assert_eq!(pipe.occupancy(0), 4);
        assert_eq!(pipe.occupancy(1), 0);
    }

    #[test]
    fn test_unknown_channel() {
        let pipe = pipe(16);
        assert_eq!(pipe.write(7, 0, CPU_HZ, 1), WriteOutcome::NoSuchChannel);
    }

    #[test]
    fn test_overflow_is_counted_and_clamped() {
        let pipe = pipe(8);
        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200 * 20, CPU_HZ, 0);
        assert_eq!(pipe.occupancy(0), 8);
        assert_eq!(pipe.stats().overflows, 1);
        assert_eq!(pipe.stats().dropouts, 0);
    }

    #[test]
    fn test_dropout_is_counted() {
        let pipe = pipe(64);
        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200 * 10, CPU_HZ, 50);
        assert_eq!(pipe.stats().dropouts, 1);
    }

    #[test]
    fn test_timeout_drops_write() {
        let pipe = pipe(64);
        pipe.write(0, 0, CPU_HZ, 0);

        let guard = pipe.hold_guard();
        assert_eq!(pipe.write(0, 400, CPU_HZ, 10), WriteOutcome::TimedOut);
        drop(guard);

        assert_eq!(pipe.stats().timeouts, 1);
        assert_eq!(pipe.occupancy(0), 0);
    }

    #[test]
    fn test_render_with_busy_guard_is_silent() {
        let pipe = pipe(64);
        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200, CPU_HZ, 100);

        let mut out = [1.0f32; 8];
        {
            let _guard = pipe.hold_guard();
            pipe.render(&mut out);
        }
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(pipe.occupancy(0), 1);
    }

    #[test]
    fn test_recorder_logs_scaled_samples_and_status() {
        let pipe = pipe(64);
        pipe.attach_recorder(Recorder::with_limit(2, 100, 20_000).expect("recorder"));

        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200, CPU_HZ, 10);
        pipe.write(0, 200 * 11, CPU_HZ, 20);

        let rec = pipe.take_recorder().expect("recorder attached");
        let entries = rec.entries(0);
        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0].sample, 10 * 256);
        assert_eq!(entries[0].status, SampleStatus::Underflow);
        assert_eq!(entries[0].tick, 200);
        assert_eq!(entries[10].status, SampleStatus::Dropout);
        assert!(entries[1..].iter().all(|e| e.sample == 0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let pipe = pipe(8);
        pipe.write(0, 0, CPU_HZ, 0);
        pipe.write(0, 200 * 20, CPU_HZ, 0);
        pipe.reset();
        assert_eq!(pipe.occupancy(0), 0);
        assert_eq!(pipe.stats(), FaultStats::default());
    }
}
