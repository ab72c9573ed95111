//! Waveform interpolation between two DAC writes
//!
//! A port write says "the level is now `new`"; the sample clock says how many
//! host samples elapsed since the previous write. The gap is filled with a
//! single sample, a short linear ramp, or silence when the gap is long enough
//! to be a dropout.

use super::RingBuffer;
use serde::{Deserialize, Serialize};

/// Default gap length (in samples) at which a gap counts as a dropout
pub const DEFAULT_RAMP_LIMIT: usize = 5;

/// Tunable thresholds for gap filling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolationPolicy {
    /// Gaps of `ramp_limit` samples or more are filled with silence
    pub ramp_limit: usize,
}

impl Default for InterpolationPolicy {
    fn default() -> Self {
        Self {
            ramp_limit: DEFAULT_RAMP_LIMIT,
        }
    }
}

/// What was appended for one write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendKind {
    /// Zero samples owed; only the level changed
    Idle,
    /// Exactly one sample of the new level
    Direct,
    /// Linear ramp ending at the new level
    Ramp,
    /// Silence for a long gap
    Silence,
}

/// Outcome of [`append_interval`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReport {
    /// Fill strategy used
    pub kind: AppendKind,
    /// Samples actually appended (after clamping)
    pub appended: usize,
    /// Ring was empty when the write arrived
    pub underflow: bool,
    /// Samples were dropped because the ring was full
    pub overflow: bool,
    /// Gap was long enough to count as a dropout
    pub dropout: bool,
}

/// Fill the gap between two writes.
///
/// `count` is the number of samples owed, `last` the previous level and
/// `new` the level just written. The count is clamped to the free space
/// before the fill strategy is chosen; an overflowing write is not also
/// reported as a dropout.
pub fn append_interval(
    ring: &mut RingBuffer<i8>,
    count: usize,
    last: i8,
    new: i8,
    policy: InterpolationPolicy,
) -> AppendReport {
    append_interval_observed(ring, count, last, new, policy, |_, _| {})
}

/// Same as [`append_interval`], calling `on_sample(level, occupancy)` for
/// every sample that lands in the ring.
pub fn append_interval_observed<F>(
    ring: &mut RingBuffer<i8>,
    count: usize,
    last: i8,
    new: i8,
    policy: InterpolationPolicy,
    mut on_sample: F,
) -> AppendReport
where
    F: FnMut(i8, usize),
{
    let underflow = ring.is_empty();

    let overflow = count > ring.free();
    let count = count.min(ring.free());

    let kind = match count {
        0 => AppendKind::Idle,
        1 => AppendKind::Direct,
        n if n < policy.ramp_limit => AppendKind::Ramp,
        _ => AppendKind::Silence,
    };

    let mut appended = 0;
    for i in 1..=count {
        let level = match kind {
            AppendKind::Silence => 0,
            _ => ramp_level(last, new, i, count),
        };
        if ring.push(level) {
            appended += 1;
            on_sample(level, ring.len());
        }
    }

    AppendReport {
        kind,
        appended,
        underflow,
        overflow,
        dropout: kind == AppendKind::Silence && !overflow,
    }
}

/// Element `i` (1-based) of a `count`-sample ramp from `last` to `new`.
///
/// Steps by `(new - last) / count`; the final element is exactly `new`.
#[inline]
fn ramp_level(last: i8, new: i8, i: usize, count: usize) -> i8 {
    if i == count {
        return new;
    }
    let slope = (new as f64 - last as f64) / count as f64;
    (last as f64 + slope * i as f64).round() as i8
}
