//! Cromemco D+7A I/O board
//!
//! Eight ports. Two of them double as DAC outputs (writes) and joystick axes
//! (reads):
//!
//! | Port | Read | Write |
//! |---|---|---|
//! | 0 | joystick buttons | latched |
//! | 1 | joystick 0 X | DAC channel 0 |
//! | 2 | joystick 0 Y | latched |
//! | 3 | joystick 1 X | DAC channel 1 |
//! | 4 | joystick 1 Y | latched |
//! | 5-7 | input latch | latched |

use crate::bus::CpuClock;
use crate::config::D7aConfig;
use crate::host::{AudioCallbacks, AudioFormat};
use crate::joystick::JoystickLatch;
use crate::recording::Recorder;
use crate::streaming::{AudioPipe, FaultStats, WriteOutcome};
use crate::Result;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Ports decoded by the board
pub const NUM_PORTS: usize = 8;

/// Cromemco D+7A
pub struct D7aBoard {
    config: D7aConfig,
    clock: Arc<dyn CpuClock>,
    pipe: AudioPipe,
    joystick: JoystickLatch,
    out_latch: [AtomicU8; NUM_PORTS],
    in_latch: [AtomicU8; NUM_PORTS],
    shut_down: AtomicBool,
}

impl D7aBoard {
    /// Create the board.
    ///
    /// A recorder is attached when `config.soundfile` is set; if its buffer
    /// cannot be reserved the board runs without recording.
    pub fn new(config: D7aConfig, clock: Arc<dyn CpuClock>) -> Result<Self> {
        let pipe = AudioPipe::new(config.stream_config())?;
        if config.soundfile.is_some() {
            if let Some(recorder) = Recorder::with_limit(2, config.recording_limit, config.sample_rate) {
                pipe.attach_recorder(recorder);
            }
        }

        let in_latch: [AtomicU8; NUM_PORTS] = Default::default();
        in_latch[0].store(0xff, Ordering::Relaxed);

        log::info!(
            "D+7A: {} Hz, ring {} samples ({:.1} ms)",
            config.sample_rate,
            config.ring_capacity,
            pipe.config().latency_ms()
        );

        Ok(Self {
            config,
            clock,
            pipe,
            joystick: JoystickLatch::new(),
            out_latch: Default::default(),
            in_latch,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Board configuration
    pub fn config(&self) -> &D7aConfig {
        &self.config
    }

    /// CPU port write (`port` is the offset from the board base)
    pub fn port_out(&self, port: u8, value: u8) {
        let port = port as usize % NUM_PORTS;
        self.out_latch[port].store(value, Ordering::Relaxed);

        let channel = match port {
            1 => 0,
            3 => 1,
            _ => return,
        };
        let outcome = self.pipe.write(
            channel,
            self.clock.ticks(),
            self.clock.frequency_hz(),
            value as i8,
        );
        if outcome == WriteOutcome::TimedOut {
            log::debug!("D+7A channel {channel}: write dropped, guard busy");
        }
    }

    /// CPU port read
    pub fn port_in(&self, port: u8) -> u8 {
        let port = port % NUM_PORTS as u8;
        self.joystick
            .port_in(port)
            .unwrap_or_else(|| self.in_latch[port as usize].load(Ordering::Relaxed))
    }

    /// Last value written to `port`
    pub fn output_latch(&self, port: u8) -> u8 {
        self.out_latch[port as usize % NUM_PORTS].load(Ordering::Relaxed)
    }

    /// Present a value on an input port that has no joystick function
    pub fn latch_input(&self, port: u8, value: u8) {
        self.in_latch[port as usize % NUM_PORTS].store(value, Ordering::Relaxed);
    }

    /// Joystick latch, for the host input thread
    pub fn joystick(&self) -> &JoystickLatch {
        &self.joystick
    }

    /// DAC audio pipe
    pub fn pipe(&self) -> &AudioPipe {
        &self.pipe
    }

    /// Current fault counters
    pub fn stats(&self) -> FaultStats {
        self.pipe.stats()
    }

    /// Front panel reset: drop queued audio and restore the latches.
    pub fn reset(&self) {
        self.pipe.reset();
        for (port, latch) in self.in_latch.iter().enumerate() {
            latch.store(if port == 0 { 0xff } else { 0 }, Ordering::Relaxed);
        }
        for latch in &self.out_latch {
            latch.store(0, Ordering::Relaxed);
        }
    }

    /// Finish the run: export the recording and report statistics.
    ///
    /// Close the host audio device first so no callback is in flight.
    /// Only the first call does any work.
    pub fn shutdown(&self) -> Result<FaultStats> {
        let stats = self.pipe.stats();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(stats);
        }

        if let (Some(path), Some(recorder)) = (&self.config.soundfile, self.pipe.take_recorder()) {
            if recorder.is_truncated() {
                log::warn!(
                    "D+7A recording hit its limit of {} entries",
                    self.config.recording_limit
                );
            }
            recorder.export_wav(path)?;
        }

        if self.config.stats {
            log::info!("D7A stats: {stats}");
        }
        Ok(stats)
    }
}

impl AudioCallbacks for D7aBoard {
    fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.config.sample_rate,
            channels: 2,
        }
    }

    fn open(&self) {
        log::info!("D+7A audio open");
    }

    fn close(&self) {
        log::info!("D+7A audio closed");
    }

    fn render(&self, out: &mut [f32]) {
        self.pipe.render(out);
    }
}

impl std::fmt::Debug for D7aBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D7aBoard")
            .field("config", &self.config)
            .field("pipe", &self.pipe)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ManualClock;
    use crate::joystick::Axis;

    fn board(config: D7aConfig) -> (D7aBoard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(4_000_000));
        let board = D7aBoard::new(config, clock.clone()).expect("board");
        (board, clock)
    }

    #[test]
    fn test_port_reads() {
        let (board, _) = board(D7aConfig::default());
        assert_eq!(board.port_in(0), 0xff);
        board.joystick().set_axis(0, Axis::X, 0x1000);
        assert_eq!(board.port_in(1), 0x10);
        assert_eq!(board.port_in(5), 0);
        board.latch_input(5, 0x5a);
        assert_eq!(board.port_in(5), 0x5a);
        // Ports wrap at 8
        assert_eq!(board.port_in(13), 0x5a);
    }

    #[test]
    fn test_writes_are_latched() {
        let (board, _) = board(D7aConfig::default());
        board.port_out(2, 0x12);
        board.port_out(1, 0x34);
        assert_eq!(board.output_latch(2), 0x12);
        assert_eq!(board.output_latch(1), 0x34);
        board.reset();
        assert_eq!(board.output_latch(1), 0);
    }

    #[test]
    fn test_dac_ports_feed_channels() {
        let (board, clock) = board(D7aConfig::default());
        board.port_out(1, 0x20);
        board.port_out(3, 0x20);
        // ~10 samples at 22050 Hz
        clock.advance(1_800);
        board.port_out(1, 0x20);
        assert!(board.pipe().occupancy(0) > 0);
        assert_eq!(board.pipe().occupancy(1), 0);

        board.port_out(3, 0x20);
        assert!(board.pipe().occupancy(1) > 0);

        // Port 2 is not a DAC
        board.port_out(2, 0x7f);
        assert_eq!(board.format().channels, 2);
    }

    #[test]
    fn test_shutdown_exports_recording() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("d7a.wav");
        let config = D7aConfig {
            soundfile: Some(path.clone()),
            stats: true,
            ..D7aConfig::default()
        };
        let (board, clock) = board(config);
        board.port_out(1, 0);
        for _ in 0..20 {
            clock.advance(181);
            board.port_out(1, 0x40);
        }

        let stats = board.shutdown().expect("shutdown");
        assert_eq!(stats.timeouts, 0);
        let reader = hound::WavReader::open(&path).expect("wav");
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert!(reader.len() > 0);

        // Second call is a no-op
        std::fs::remove_file(&path).expect("remove");
        board.shutdown().expect("shutdown");
        assert!(!path.exists());
    }

    #[test]
    fn test_no_recording_without_soundfile() {
        let (board, clock) = board(D7aConfig::default());
        board.port_out(1, 0);
        clock.advance(1_000);
        board.port_out(1, 0x10);
        assert!(board.pipe().take_recorder().is_none());
        board.shutdown().expect("shutdown");
    }
}
