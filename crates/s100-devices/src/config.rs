//! Typed device configuration
//!
//! Read once at init from a JSON document. Every field is optional; missing
//! fields take the board defaults.
//!
//! ```
//! use s100_devices::config::{DeviceConfig, HiResMode};
//!
//! let config = DeviceConfig::from_json(r#"{
//!     "d7a": { "sample_rate": 44100, "stats": true },
//!     "hires": { "mode": "halftone", "foreground": "ffb000" }
//! }"#).unwrap();
//!
//! assert_eq!(config.d7a.sample_rate, 44_100);
//! assert_eq!(config.d7a.ring_capacity, 4048);
//! assert_eq!(config.hires.mode, HiResMode::Halftone);
//! ```

use crate::clock::DEFAULT_DRIFT_CORRECTION;
use crate::psg::{ChipFamily, DEFAULT_CLOCK_HZ, DEFAULT_SAMPLE_RATE};
use crate::streaming::interpolator::DEFAULT_RAMP_LIMIT;
use crate::streaming::{InterpolationPolicy, StreamConfig, DEFAULT_RING_CAPACITY};
use crate::video::Rgb;
use crate::{DeviceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of entries kept per recorded channel
pub const DEFAULT_RECORDING_LIMIT: usize = 10_000_000;

/// Default host callback size (in frames)
pub const DEFAULT_BUFFER_FRAMES: usize = 64;

/// Configuration for every board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Cromemco D+7A I/O
    pub d7a: D7aConfig,
    /// ADS Noisemaker
    pub noisemaker: NoisemakerConfig,
    /// Cromemco Dazzler
    pub dazzler: DazzlerConfig,
    /// Vector Graphic HiRes
    pub hires: HiResConfig,
}

impl DeviceConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DeviceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::debug!("loaded device configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Pretty JSON, e.g. to write out a template.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no board can run with.
    pub fn validate(&self) -> Result<()> {
        self.d7a.validate()?;
        self.noisemaker.validate()?;
        self.dazzler.validate()?;
        Ok(())
    }
}

/// Cromemco D+7A I/O board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct D7aConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Multiplier applied to the tick/sample ratio
    pub sync_adjust: f64,
    /// Recorded entries per channel
    pub recording_limit: usize,
    /// WAV file written at shutdown; recording is off without one
    pub soundfile: Option<PathBuf>,
    /// Log fault statistics at shutdown
    pub stats: bool,
    /// Ring size per channel (in samples)
    pub ring_capacity: usize,
    /// Gap length (in samples) at which a gap counts as a dropout
    pub ramp_limit: usize,
    /// Longest producer wait for the ring guard, in microseconds
    pub guard_timeout_us: u64,
    /// Host callback size (in frames)
    pub buffer_frames: usize,
}

impl Default for D7aConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            sync_adjust: DEFAULT_DRIFT_CORRECTION,
            recording_limit: DEFAULT_RECORDING_LIMIT,
            soundfile: None,
            stats: false,
            ring_capacity: DEFAULT_RING_CAPACITY,
            ramp_limit: DEFAULT_RAMP_LIMIT,
            guard_timeout_us: 1_000,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

impl D7aConfig {
    /// Stereo stream configuration for the DAC pipe
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            ring_capacity: self.ring_capacity,
            drift_correction: self.sync_adjust,
            policy: InterpolationPolicy {
                ramp_limit: self.ramp_limit,
            },
            guard_timeout: Duration::from_micros(self.guard_timeout_us),
            ..StreamConfig::stereo(self.sample_rate)
        }
    }

    fn validate(&self) -> Result<()> {
        self.stream_config().validate()?;
        if self.ramp_limit < 2 {
            return Err(DeviceError::Config(format!(
                "d7a.ramp_limit must be at least 2, got {}",
                self.ramp_limit
            )));
        }
        if !(self.sync_adjust.is_finite() && self.sync_adjust > 0.0) {
            return Err(DeviceError::Config(format!(
                "d7a.sync_adjust must be positive, got {}",
                self.sync_adjust
            )));
        }
        if self.buffer_frames == 0 {
            return Err(DeviceError::Config("d7a.buffer_frames must be > 0".into()));
        }
        Ok(())
    }
}

/// ADS Noisemaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoisemakerConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// PSG input clock in Hz
    pub clock_hz: f64,
    /// DAC curve to emulate
    pub family: ChipFamily,
    /// Recorded frames
    pub recording_limit: usize,
    /// WAV file written at shutdown; recording is off without one
    pub soundfile: Option<PathBuf>,
    /// Host callback size (in frames)
    pub buffer_frames: usize,
}

impl Default for NoisemakerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            clock_hz: DEFAULT_CLOCK_HZ,
            family: ChipFamily::default(),
            recording_limit: DEFAULT_RECORDING_LIMIT,
            soundfile: None,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

impl NoisemakerConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DeviceError::Config("noisemaker.sample_rate must be > 0".into()));
        }
        if !(self.clock_hz.is_finite() && self.clock_hz > 0.0) {
            return Err(DeviceError::Config(format!(
                "noisemaker.clock_hz must be positive, got {}",
                self.clock_hz
            )));
        }
        if self.buffer_frames == 0 {
            return Err(DeviceError::Config("noisemaker.buffer_frames must be > 0".into()));
        }
        Ok(())
    }
}

/// Cromemco Dazzler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DazzlerConfig {
    /// Alternate odd/even fields instead of drawing full frames
    pub interlaced: bool,
    /// Pace each DMA group against the CPU clock
    pub line_sync: bool,
    /// Scale the canvas by an integer factor of the window size
    pub discrete_scale: bool,
    /// Host window edge in pixels
    pub window_size: u32,
}

impl Default for DazzlerConfig {
    fn default() -> Self {
        Self {
            interlaced: false,
            line_sync: false,
            discrete_scale: false,
            window_size: crate::video::dazzler::CANVAS_SIZE,
        }
    }
}

impl DazzlerConfig {
    fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(DeviceError::Config("dazzler.window_size must be > 0".into()));
        }
        Ok(())
    }
}

/// HiRes video mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiResMode {
    /// 256×240, one bit per pixel
    #[default]
    Bilevel,
    /// 128×120, 16 shades per pixel
    #[serde(alias = "greyscale", alias = "grayscale")]
    Halftone,
}

/// Vector Graphic HiRes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiResConfig {
    /// Video mode
    pub mode: HiResMode,
    /// Start of video memory
    pub address: u16,
    /// Foreground color
    pub foreground: Rgb,
}

impl Default for HiResConfig {
    fn default() -> Self {
        Self {
            mode: HiResMode::Bilevel,
            address: 0xe000,
            foreground: Rgb::new(0, 255, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_boards() {
        let config = DeviceConfig::default();
        assert_eq!(config.d7a.sample_rate, 22_050);
        assert_eq!(config.d7a.sync_adjust, 1.0247);
        assert_eq!(config.d7a.recording_limit, 10_000_000);
        assert_eq!(config.d7a.ring_capacity, 4048);
        assert_eq!(config.d7a.ramp_limit, 5);
        assert_eq!(config.noisemaker.sample_rate, 44_100);
        assert_eq!(config.noisemaker.clock_hz, 2_000_000.0);
        assert!(!config.dazzler.interlaced);
        assert!(!config.dazzler.line_sync);
        assert_eq!(config.hires.address, 0xe000);
        assert_eq!(config.hires.foreground, Rgb::new(0, 255, 0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_takes_defaults() {
        assert_eq!(DeviceConfig::from_json("{}").expect("parse"), DeviceConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = DeviceConfig::from_json(
            r#"{
                "d7a": { "soundfile": "out.wav", "ramp_limit": 8, "guard_timeout_us": 250 },
                "dazzler": { "interlaced": true },
                "hires": { "mode": "greyscale", "address": 49152 }
            }"#,
        )
        .expect("parse");

        assert_eq!(config.d7a.soundfile, Some(PathBuf::from("out.wav")));
        assert_eq!(config.d7a.sample_rate, 22_050);
        assert!(config.dazzler.interlaced);
        assert_eq!(config.hires.mode, HiResMode::Halftone);
        assert_eq!(config.hires.address, 0xc000);

        let stream = config.d7a.stream_config();
        assert_eq!(stream.policy.ramp_limit, 8);
        assert_eq!(stream.guard_timeout, Duration::from_micros(250));
        assert_eq!(stream.channels, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for json in [
            r#"{ "d7a": { "sample_rate": 0 } }"#,
            r#"{ "d7a": { "ring_capacity": 0 } }"#,
            r#"{ "d7a": { "ramp_limit": 1 } }"#,
            r#"{ "d7a": { "sync_adjust": -1.0 } }"#,
            r#"{ "noisemaker": { "clock_hz": 0.0 } }"#,
            r#"{ "dazzler": { "window_size": 0 } }"#,
        ] {
            assert!(
                matches!(DeviceConfig::from_json(json), Err(DeviceError::Config(_))),
                "{json}"
            );
        }
        assert!(matches!(
            DeviceConfig::from_json(r#"{ "hires": { "foreground": "green" } }"#),
            Err(DeviceError::Json(_))
        ));
        assert!(matches!(
            DeviceConfig::from_json(r#"{ "hires": { "mode": "color" } }"#),
            Err(DeviceError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{ "noisemaker": {{ "family": "ym", "sample_rate": 48000 }} }}"#)
            .expect("write");

        let config = DeviceConfig::load(file.path()).expect("load");
        assert_eq!(config.noisemaker.family, ChipFamily::Ym);
        assert_eq!(config.noisemaker.sample_rate, 48_000);

        assert!(matches!(
            DeviceConfig::load("/nonexistent/s100.json"),
            Err(DeviceError::Io(_))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_color_hex() {
        let config = DeviceConfig::default();
        let json = config.to_json().expect("json");
        assert!(json.contains("\"foreground\": \"00ff00\""));
        assert_eq!(DeviceConfig::from_json(&json).expect("parse"), config);
    }
}
