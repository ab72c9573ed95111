//! Audio subcommands: PSG tone rendering and the D+7A DAC pipeline.

use anyhow::{Context, Result};
use s100_devices::boards::{D7aBoard, NoisemakerBoard};
use s100_devices::bus::ManualClock;
use s100_devices::config::{D7aConfig, NoisemakerConfig};
use s100_devices::host::AudioCallbacks;
use s100_devices::FaultStats;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for `tone`
#[derive(Debug, Clone)]
pub struct ToneOptions {
    /// Tone frequency in Hz
    pub frequency: f64,
    /// Channel 0-2
    pub channel: usize,
    /// Fixed volume 0-15
    pub volume: u8,
    /// Mix in noise at this period
    pub noise: Option<u8>,
    /// Drive the volume from this envelope shape
    pub envelope: Option<u8>,
    /// Envelope period
    pub envelope_period: u16,
    /// Length of the render in seconds
    pub seconds: f64,
    /// WAV output
    pub output: PathBuf,
}

/// Summary printed after `tone`
#[derive(Debug, Serialize)]
pub struct ToneReport {
    /// Tone period written to the chip
    pub period: u16,
    /// Frequency the period actually produces
    pub actual_hz: f64,
    /// Frames rendered
    pub frames: usize,
    /// Peak absolute output
    pub peak: f32,
}

/// Tone period for `frequency` at `clock_hz`, clamped to 12 bits
pub fn tone_period(clock_hz: f64, frequency: f64) -> u16 {
    let period = (clock_hz / (16.0 * frequency)).round();
    period.clamp(1.0, 4095.0) as u16
}

/// Program one channel of both Noisemaker chips through the ports.
fn program_tone(board: &NoisemakerBoard, opts: &ToneOptions, period: u16) {
    let channel = opts.channel.min(2) as u8;

    let mut mixer = 0x3f & !(1 << channel);
    if opts.noise.is_some() {
        mixer &= !(1 << (channel + 3));
    }
    let volume = if opts.envelope.is_some() {
        0x10
    } else {
        opts.volume & 0x0f
    };

    let mut writes = vec![
        (channel * 2, (period & 0xff) as u8),
        (channel * 2 + 1, (period >> 8) as u8),
        (7, mixer),
        (8, 0),
        (9, 0),
        (10, 0),
        (8 + channel, volume),
    ];
    if let Some(noise) = opts.noise {
        writes.push((6, noise));
    }
    if let Some(shape) = opts.envelope {
        writes.push((11, (opts.envelope_period & 0xff) as u8));
        writes.push((12, (opts.envelope_period >> 8) as u8));
        writes.push((13, shape));
    }

    for (register, value) in writes {
        // Left chip on ports 0/1, right chip on 2/3
        for select in [0u8, 2] {
            board.port_out(select, register);
            board.port_out(select + 1, value);
        }
    }
}

/// Render a PSG tone through the Noisemaker and write it to a WAV file.
pub fn run_tone(config: NoisemakerConfig, opts: &ToneOptions, play: bool) -> Result<ToneReport> {
    let frames = (opts.seconds * config.sample_rate as f64).round() as usize;
    let config = NoisemakerConfig {
        soundfile: Some(opts.output.clone()),
        recording_limit: frames,
        ..config
    };
    let buffer_frames = config.buffer_frames;
    let period = tone_period(config.clock_hz, opts.frequency);
    let actual_hz = config.clock_hz / (16.0 * period as f64);

    if play {
        // Live preview on its own board so the recording starts clean
        let preview = Arc::new(
            NoisemakerBoard::new(NoisemakerConfig {
                soundfile: None,
                ..config.clone()
            })
            .context("Failed to create Noisemaker")?,
        );
        program_tone(&preview, opts, period);
        if let Some(device) = open_live(preview as Arc<dyn AudioCallbacks>, buffer_frames) {
            std::thread::sleep(Duration::from_secs_f64(opts.seconds));
            device.close();
        }
    }

    let board = NoisemakerBoard::new(config).context("Failed to create Noisemaker")?;
    program_tone(&board, opts, period);
    log::info!(
        "Tone: channel {} period {} ({:.2} Hz), {} frames",
        opts.channel,
        period,
        actual_hz,
        frames
    );

    let mut buffer = vec![0.0f32; buffer_frames * 2];
    let mut peak = 0.0f32;
    let mut rendered = 0;
    while rendered < frames {
        let n = (frames - rendered).min(buffer_frames);
        let chunk = &mut buffer[..n * 2];
        board.render(chunk);
        peak = chunk.iter().fold(peak, |m, s| m.max(s.abs()));
        rendered += n;
    }

    board.shutdown().context("Failed to write recording")?;
    Ok(ToneReport {
        period,
        actual_hz,
        frames,
        peak,
    })
}

/// Options for `dac`
#[derive(Debug, Clone)]
pub struct DacOptions {
    /// Square wave frequency in Hz
    pub frequency: f64,
    /// Peak level (1-127)
    pub amplitude: i8,
    /// Emulated CPU clock in Hz
    pub cpu_hz: u64,
    /// Port writes per second
    pub write_rate: u32,
    /// Emulated run length in seconds
    pub seconds: f64,
    /// WAV output of the recorded samples
    pub output: Option<PathBuf>,
}

/// Summary printed after `dac`
#[derive(Debug, Serialize)]
pub struct DacReport {
    /// Port writes per channel
    pub writes: u64,
    /// Host callbacks served
    pub callbacks: u64,
    /// Samples left queued on channel 0 at the end
    pub occupancy: usize,
    /// Fault counters
    pub stats: FaultStats,
}

/// Replay a synthetic square wave through the D+7A pipeline.
///
/// The CPU side writes both DAC ports at `write_rate`; a simulated host
/// device pulls one buffer every `buffer_frames` sample periods of emulated
/// time.
pub fn run_dac(config: D7aConfig, opts: &DacOptions, play: bool) -> Result<DacReport> {
    let config = D7aConfig {
        soundfile: opts.output.clone().or(config.soundfile),
        ..config
    };
    let buffer_frames = config.buffer_frames;
    let sample_rate = config.sample_rate;

    let clock = Arc::new(ManualClock::new(opts.cpu_hz));
    let board = Arc::new(D7aBoard::new(config, clock.clone()).context("Failed to create D+7A")?);

    let live = if play {
        open_live(Arc::clone(&board) as Arc<dyn AudioCallbacks>, buffer_frames)
    } else {
        None
    };

    let ticks_per_write = (opts.cpu_hz / opts.write_rate.max(1) as u64).max(1);
    let ticks_per_callback = (buffer_frames as u64 * opts.cpu_hz / sample_rate as u64).max(1);
    let half_period = (opts.cpu_hz as f64 / (2.0 * opts.frequency)).max(1.0);
    let total_ticks = (opts.seconds * opts.cpu_hz as f64) as u64;

    let mut buffer = vec![0.0f32; buffer_frames * 2];
    // Let a few buffers queue up before the first callback
    let mut next_callback = ticks_per_callback * 4;
    let mut writes = 0u64;
    let mut callbacks = 0u64;

    let mut tick = 0u64;
    while tick < total_ticks {
        clock.set(tick);
        let high = ((tick as f64 / half_period) as u64) % 2 == 0;
        let level = if high { opts.amplitude } else { -opts.amplitude };
        board.port_out(1, level as u8);
        board.port_out(3, level as u8);
        writes += 1;

        if live.is_none() {
            while tick >= next_callback {
                board.render(&mut buffer);
                next_callback += ticks_per_callback;
                callbacks += 1;
            }
        } else {
            // Real time: the host device drains at its own pace
            std::thread::sleep(Duration::from_nanos(
                ticks_per_write * 1_000_000_000 / opts.cpu_hz,
            ));
        }
        tick += ticks_per_write;
    }

    if let Some(device) = live {
        device.close();
    }

    let occupancy = board.pipe().occupancy(0);
    let stats = board.shutdown().context("Failed to finish D+7A run")?;
    Ok(DacReport {
        writes,
        callbacks,
        occupancy,
        stats,
    })
}

#[cfg(feature = "playback")]
use s100_devices::AudioDevice as LiveDevice;

/// Stand-in for the host audio device when playback is compiled out
#[cfg(not(feature = "playback"))]
#[allow(dead_code)]
struct LiveDevice;

#[cfg(not(feature = "playback"))]
impl LiveDevice {
    fn close(&self) {}
}

/// Open the host audio device, falling back to offline rendering.
#[cfg(feature = "playback")]
fn open_live(device: Arc<dyn AudioCallbacks>, buffer_frames: usize) -> Option<LiveDevice> {
    match LiveDevice::open(device, buffer_frames) {
        Ok(audio) => Some(audio),
        Err(err) => {
            log::warn!("Audio output unavailable, rendering offline: {err}");
            None
        }
    }
}

#[cfg(not(feature = "playback"))]
fn open_live(_device: Arc<dyn AudioCallbacks>, _buffer_frames: usize) -> Option<LiveDevice> {
    log::warn!("Built without the `playback` feature, rendering offline");
    None
}
