//! Sound generators for the PSG
//!
//! This module contains the individual generator components:
//! - Tone generators (3 channels)
//! - Noise generator (shared 17-bit LFSR)
//! - Envelope generator (16 two-segment shapes)
//!
//! All generators advance once per internal step; the chip calls them from
//! its mixer.

use super::tables::ENVELOPE_SHAPES;

/// Number of tone channels
pub const NUM_CHANNELS: usize = 3;

/// Highest envelope level
pub const ENVELOPE_MAX: i32 = 31;

/// Clamp a period to its register width; a period of 0 behaves as 1.
#[inline]
fn normalize_period(period: u32, mask: u32) -> u32 {
    let period = period & mask;
    period.max(1)
}

/// Tone generator for a single channel
///
/// A 12-bit period counter that toggles the output each time it reaches the
/// period, so one full square cycle takes `2 * period` steps.
#[derive(Clone, Debug)]
pub struct ToneGenerator {
    counter: u32,
    period: u32,
    output: u8,
}

impl ToneGenerator {
    /// Create a tone generator at period 1
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            output: 0,
        }
    }

    /// Set the period (12-bit)
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = normalize_period(period, 0x0fff);
    }

    /// Effective period
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Current output bit
    #[inline]
    pub fn output(&self) -> u8 {
        self.output
    }

    /// Advance one step and return the output bit
    #[inline]
    pub fn tick(&mut self) -> u8 {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            self.output ^= 1;
        }
        self.output
    }
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise generator using a 17-bit LFSR
///
/// Runs at half the tone rate: the shift register advances every
/// `2 * period` steps with feedback from bits 0 and 3.
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    counter: u32,
    period: u32,
    lfsr: u32,
}

impl NoiseGenerator {
    /// Create a noise generator with a seeded shift register
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            lfsr: 1, // Must be non-zero
        }
    }

    /// Set the period (5-bit)
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = normalize_period(period, 0x1f);
    }

    /// Effective period
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Raw shift register state
    #[inline]
    pub fn lfsr(&self) -> u32 {
        self.lfsr
    }

    /// Advance one step and return the output bit
    #[inline]
    pub fn tick(&mut self) -> u8 {
        self.counter += 1;
        if self.counter >= self.period << 1 {
            self.counter = 0;
            let feedback = (self.lfsr ^ (self.lfsr >> 3)) & 1;
            self.lfsr = (self.lfsr >> 1) | (feedback << 16);
        }
        (self.lfsr & 1) as u8
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// What an envelope segment does to the level on each period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeAction {
    /// Count up to 31, then move to the other segment
    SlideUp,
    /// Count down to 0, then move to the other segment
    SlideDown,
    /// Hold at 31
    HoldTop,
    /// Hold at 0
    HoldBottom,
}

/// Envelope generator with 16 hardware shapes
///
/// Every shape is a pair of segments. Sliding segments flip to the other
/// segment when they run past either end; holding segments keep the level.
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    counter: u32,
    period: u32,
    shape: u8,
    segment: usize,
    level: i32,
}

impl EnvelopeGenerator {
    /// Create an envelope generator at shape 0, period 1
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            shape: 0,
            segment: 0,
            level: 0,
        }
    }

    /// Set the period (16-bit)
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = normalize_period(period, 0xffff);
    }

    /// Effective period
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Select a shape and restart it from its first segment
    pub fn set_shape(&mut self, shape: u8) {
        self.shape = shape & 0x0f;
        self.counter = 0;
        self.segment = 0;
        self.reset_segment();
    }

    /// Current shape (0-15)
    #[inline]
    pub fn shape(&self) -> u8 {
        self.shape
    }

    /// Current level (0-31)
    #[inline]
    pub fn level(&self) -> u8 {
        self.level as u8
    }

    /// Action of the running segment
    #[inline]
    pub fn action(&self) -> EnvelopeAction {
        ENVELOPE_SHAPES[self.shape as usize][self.segment]
    }

    /// Whether the envelope has settled on a constant level
    pub fn is_holding(&self) -> bool {
        matches!(
            self.action(),
            EnvelopeAction::HoldTop | EnvelopeAction::HoldBottom
        )
    }

    /// Advance one step and return the level
    #[inline]
    pub fn tick(&mut self) -> u8 {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            match self.action() {
                EnvelopeAction::SlideUp => {
                    self.level += 1;
                    if self.level > ENVELOPE_MAX {
                        self.next_segment();
                    }
                }
                EnvelopeAction::SlideDown => {
                    self.level -= 1;
                    if self.level < 0 {
                        self.next_segment();
                    }
                }
                EnvelopeAction::HoldTop | EnvelopeAction::HoldBottom => {}
            }
        }
        self.level()
    }

    fn next_segment(&mut self) {
        self.segment ^= 1;
        self.reset_segment();
    }

    fn reset_segment(&mut self) {
        self.level = match self.action() {
            EnvelopeAction::SlideDown | EnvelopeAction::HoldTop => ENVELOPE_MAX,
            EnvelopeAction::SlideUp | EnvelopeAction::HoldBottom => 0,
        };
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
