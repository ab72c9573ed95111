//! ADS Noisemaker
//!
//! Two AY-3-8910s, one per stereo side. Each chip has a register select
//! port and a data port:
//!
//! | Port | Function |
//! |---|---|
//! | 0 | PSG 1 register select |
//! | 1 | PSG 1 data |
//! | 2 | PSG 2 register select |
//! | 3 | PSG 2 data |

use crate::config::NoisemakerConfig;
use crate::host::{AudioCallbacks, AudioFormat};
use crate::psg::Psg;
use crate::recording::Recorder;
use crate::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

struct Chips {
    left: Psg,
    right: Psg,
    recorder: Option<Recorder>,
    frame: u64,
}

/// ADS Noisemaker
pub struct NoisemakerBoard {
    config: NoisemakerConfig,
    chips: Mutex<Chips>,
    /// Callbacks that found the chips busy and rendered silence
    contended: AtomicU64,
    shut_down: AtomicBool,
}

impl NoisemakerBoard {
    /// Create the board with both chips in their power-on state.
    pub fn new(config: NoisemakerConfig) -> Result<Self> {
        let left = Psg::new(config.family, config.clock_hz, config.sample_rate)?;
        let right = Psg::new(config.family, config.clock_hz, config.sample_rate)?;
        let recorder = config
            .soundfile
            .as_ref()
            .and_then(|_| Recorder::with_limit(2, config.recording_limit, config.sample_rate));

        log::info!(
            "Noisemaker: 2x {} @ {} Hz, {} Hz output",
            config.family,
            config.clock_hz,
            config.sample_rate
        );

        Ok(Self {
            config,
            chips: Mutex::new(Chips {
                left,
                right,
                recorder,
                frame: 0,
            }),
            contended: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Board configuration
    pub fn config(&self) -> &NoisemakerConfig {
        &self.config
    }

    /// CPU port write (`port` is the offset from the board base)
    pub fn port_out(&self, port: u8, value: u8) {
        let mut chips = self.chips.lock();
        match port {
            0 | 1 => chips.left.write_port(port, value),
            2 | 3 => chips.right.write_port(port, value),
            _ => log::trace!("Noisemaker: write {value:02x} to unused port {port}"),
        }
    }

    /// Run `f` with mutable access to both chips (left, right)
    pub fn with_chips<R>(&self, f: impl FnOnce(&mut Psg, &mut Psg) -> R) -> R {
        let mut guard = self.chips.lock();
        let chips = &mut *guard;
        f(&mut chips.left, &mut chips.right)
    }

    /// Callbacks that rendered silence because a port write held the chips
    pub fn contended_callbacks(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    /// Front panel reset: both chips back to power-on.
    pub fn reset(&self) -> Result<()> {
        let mut chips = self.chips.lock();
        chips.left.reset()?;
        chips.right.reset()
    }

    /// Export the recording, if one was configured. Only the first call does
    /// any work.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let recorder = self.chips.lock().recorder.take();
        if let (Some(path), Some(recorder)) = (&self.config.soundfile, recorder) {
            if recorder.is_truncated() {
                log::warn!(
                    "Noisemaker recording hit its limit of {} frames",
                    self.config.recording_limit
                );
            }
            recorder.export_wav(path)?;
        }
        Ok(())
    }
}

/// Scale a PSG sample to 16-bit PCM; out of range values saturate
#[inline]
fn to_pcm(sample: f64) -> i16 {
    (sample * 32767.0) as i16
}

impl AudioCallbacks for NoisemakerBoard {
    fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.config.sample_rate,
            channels: 2,
        }
    }

    fn open(&self) {
        log::info!("Noisemaker audio open");
    }

    fn close(&self) {
        log::info!("Noisemaker audio closed");
    }

    fn render(&self, out: &mut [f32]) {
        let Some(mut guard) = self.chips.try_lock() else {
            self.contended.fetch_add(1, Ordering::Relaxed);
            out.fill(0.0);
            return;
        };
        let chips = &mut *guard;
        let mut frames = out.chunks_exact_mut(2);
        for frame in &mut frames {
            chips.left.process();
            chips.right.process();
            let left = chips.left.remove_dc();
            let right = chips.right.remove_dc();

            frame[0] = left.clamp(-1.0, 1.0) as f32;
            frame[1] = right.clamp(-1.0, 1.0) as f32;

            if let Some(recorder) = chips.recorder.as_mut() {
                recorder.record_frame(chips.frame, &[to_pcm(left), to_pcm(right)]);
            }
            chips.frame += 1;
        }
        frames.into_remainder().fill(0.0);
    }
}

impl std::fmt::Debug for NoisemakerBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoisemakerBoard")
            .field("config", &self.config)
            .field("contended", &self.contended_callbacks())
            .finish_non_exhaustive()
    }
}
