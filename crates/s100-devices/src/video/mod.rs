//! Raster scan-out
//!
//! Display boards read emulated memory by DMA and paint rectangles onto a
//! [`Surface`]. Frames are produced on demand through
//! [`DisplayDevice::produce_frame`](crate::host::DisplayDevice::produce_frame),
//! driven by one of the [`trigger`] implementations.

pub mod dazzler;
pub mod hires;
pub mod pacing;
pub mod registers;
mod surface;
pub mod trigger;

pub use dazzler::{Dazzler, Field, FrameReport};
pub use hires::HiRes;
pub use pacing::{Sleeper, ThreadSleeper, TickPacer, WaitOutcome};
pub use registers::{Control, Format, StatusFlags};
pub use surface::{FrameBuffer, Rgb, Surface};
pub use trigger::{DisplayWorker, RedrawTick, RefreshTrigger};
