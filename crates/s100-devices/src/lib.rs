//! S-100 peripheral emulation devices
//!
//! Emulates the sound and video boards that hang off an 8-bit CPU emulator's
//! I/O bus and keeps them in step with three clocks that never agree: the
//! emulated CPU clock, the host audio device and the host display.
//!
//! # Boards
//! - Cromemco D+7A I/O: two DAC audio channels plus two joysticks
//! - ADS Noisemaker: two AY-3-8910 PSGs in stereo
//! - Cromemco Dazzler: DMA driven raster display with interlace and line sync
//! - Vector Graphic HiRes: bilevel/halftone raster display
//!
//! # Crate feature flags
//! - `streaming` (optional): real-time audio output via rodio
//!
//! # Quick start
//! ```no_run
//! use s100_devices::boards::D7aBoard;
//! use s100_devices::bus::ManualClock;
//! use s100_devices::config::D7aConfig;
//! use std::sync::Arc;
//!
//! # fn main() -> s100_devices::Result<()> {
//! let clock = Arc::new(ManualClock::new(4_000_000));
//! let board = D7aBoard::new(D7aConfig::default(), clock.clone())?;
//!
//! // CPU writes a DAC level to port 1 (channel 0)
//! clock.advance(181);
//! board.port_out(1, 0x40);
//!
//! // Host audio thread pulls interleaved stereo frames
//! let mut out = [0.0f32; 128];
//! board.pipe().render(&mut out);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod boards; // Emulated board façades (D+7A, Noisemaker)
pub mod bus; // CPU clock + DMA collaborator traits
pub mod clock; // Emulated tick -> host sample mapping
pub mod config; // Typed device configuration
pub mod host; // Host audio/display capability traits
pub mod joystick; // Joystick axis/button latch
pub mod psg; // AY-3-8910 / YM2149 core
pub mod recording; // Sample log + WAV export
pub mod streaming; // Ring buffers, interpolation, audio bridge
pub mod video; // Raster scan-out (Dazzler, HiRes)

/// Error types for device emulation operations
///
/// Audio faults (underflow, overflow, dropout, timeout) are counted, never
/// returned; see [`streaming::FaultStats`].
#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Host audio device could not be opened or driven
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// WAV encoding/decoding failure
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for DeviceError {
    /// Converts a String into `DeviceError::Other`.
    ///
    /// Prefer the specific variants (`Config`, `AudioDevice`) where the
    /// failure has a known cause.
    fn from(msg: String) -> Self {
        DeviceError::Other(msg)
    }
}

impl From<&str> for DeviceError {
    fn from(msg: &str) -> Self {
        DeviceError::Other(msg.to_string())
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

// Public API exports
pub use boards::{D7aBoard, NoisemakerBoard};
pub use bus::{CpuClock, DmaMemory};
pub use clock::{ChannelTimingState, SampleClock};
pub use config::DeviceConfig;
pub use host::{AudioCallbacks, DisplayDevice};
pub use joystick::JoystickLatch;
pub use psg::{ChipFamily, Psg};
pub use recording::{Recorder, SampleStatus};
pub use streaming::{AudioPipe, FaultStats, RingBuffer};
pub use video::{Dazzler, HiRes};

#[cfg(feature = "streaming")]
pub use streaming::AudioDevice;
