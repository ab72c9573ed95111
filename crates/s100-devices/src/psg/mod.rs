//! AY-3-8910 / YM2149 programmable sound generator
//!
//! Three square-wave tone channels, a shared noise generator and an envelope
//! unit, mixed through the chip's DAC curve and band-limited down to the
//! output rate.
//!
//! ```
//! use s100_devices::psg::{ChipFamily, Psg, DEFAULT_CLOCK_HZ};
//!
//! let mut psg = Psg::new(ChipFamily::Ay, DEFAULT_CLOCK_HZ, 44_100).unwrap();
//! psg.set_tone(0, 284); // ~440 Hz on channel A
//! let sample = psg.next_sample();
//! assert!(sample.abs() <= 3.0);
//! ```

mod chip;
mod dc_filter;
mod fir;
pub mod generators;
mod tables;

pub use chip::{Psg, DEFAULT_CLOCK_HZ, DEFAULT_SAMPLE_RATE, NUM_REGISTERS};
pub use dc_filter::DcFilter;
pub use generators::{EnvelopeAction, EnvelopeGenerator, NoiseGenerator, ToneGenerator};

use serde::{Deserialize, Serialize};

/// Which chip's DAC curve to emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipFamily {
    /// General Instrument AY-3-8910 (16 volume steps)
    #[default]
    Ay,
    /// Yamaha YM2149 (32 volume steps)
    Ym,
}

impl ChipFamily {
    pub(crate) fn dac_table(self) -> &'static [f64; 32] {
        match self {
            ChipFamily::Ay => &tables::AY_DAC_TABLE,
            ChipFamily::Ym => &tables::YM_DAC_TABLE,
        }
    }
}

impl std::fmt::Display for ChipFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChipFamily::Ay => f.write_str("AY-3-8910"),
            ChipFamily::Ym => f.write_str("YM2149"),
        }
    }
}
