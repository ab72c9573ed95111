//! Emulated boards
//!
//! Each board is a façade over the shared building blocks: port decoding
//! for the CPU thread, [`AudioCallbacks`](crate::host::AudioCallbacks) for
//! the host audio thread, and an explicit shutdown that writes recordings.

pub mod d7a;
pub mod noisemaker;

pub use d7a::D7aBoard;
pub use noisemaker::NoisemakerBoard;
