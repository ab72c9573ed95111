//! Host audio callback side of the pipe
//!
//! Drains the per-channel rings into the interleaved float buffer the host
//! device asked for. Runs on the host audio thread with the guard held, so it
//! must not allocate or block.

use super::pipe::RingSet;

/// Scale from signed 8-bit DAC level to `[-1, 1)`
const LEVEL_SCALE: f32 = 1.0 / 128.0;

/// Fill `out` with interleaved frames popped from `rings`.
///
/// Startup rule: when the rings were completely empty at the start of the
/// previous callback (or this is the first one), the front of the buffer is
/// padded with `frames - backlog` silent frames so the queued backlog plays
/// contiguously at the end instead of being split by gaps.
pub(crate) fn drain_into(rings: &mut RingSet, out: &mut [f32]) {
    let channels = rings.channels.len();
    if channels == 0 {
        out.fill(0.0);
        return;
    }

    let frames = out.len() / channels;
    let backlog = rings
        .channels
        .iter()
        .map(|ring| ring.len())
        .max()
        .unwrap_or(0);

    let mut first_frame = 0;
    if backlog == 0 {
        rings.primed = false;
    } else if !rings.primed {
        first_frame = frames.saturating_sub(backlog);
        rings.primed = true;
    }

    out[..first_frame * channels].fill(0.0);
    for frame in out[first_frame * channels..frames * channels].chunks_exact_mut(channels) {
        for (slot, ring) in frame.iter_mut().zip(rings.channels.iter_mut()) {
            *slot = ring.pop().map_or(0.0, |level| level as f32 * LEVEL_SCALE);
        }
    }
    out[frames * channels..].fill(0.0);
}
