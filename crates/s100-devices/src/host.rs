//! Host capability interfaces
//!
//! Devices never assume which thread calls them. The host audio or display
//! runtime opens a device, asks it for samples or frames at its own pace and
//! closes it again; these traits are that contract.

use crate::video::Surface;
use std::time::Duration;

/// Format negotiated with the host audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channels per frame
    pub channels: u16,
}

/// A device that produces audio for a host output stream
///
/// `render` runs on the host audio thread: it must not block and must not
/// allocate.
pub trait AudioCallbacks: Send + Sync {
    /// Output format this device renders.
    fn format(&self) -> AudioFormat;

    /// Called once the host stream is running.
    fn open(&self) {}

    /// Called after the host stream stopped; no `render` call is in flight.
    fn close(&self) {}

    /// Fill `out` with interleaved `f32` frames in `[-1, 1]`.
    fn render(&self, out: &mut [f32]);
}

/// What a display device did for one refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was scanned and presented
    Drawn,
    /// The board is off; the surface was cleared
    Blank,
}

/// A device that renders frames for a host display
pub trait DisplayDevice: Send + Sync {
    /// Canvas size in pixels at scale 1.
    fn canvas_size(&self) -> (u32, u32);

    /// Interval at which a dedicated refresh loop should run.
    fn frame_interval(&self) -> Duration;

    /// Called when the host display is ready.
    fn open(&self) {}

    /// Called after the host display was torn down.
    fn close(&self) {}

    /// Scan one frame into `surface` and present it.
    fn produce_frame(&self, surface: &mut dyn Surface) -> FrameOutcome;
}
