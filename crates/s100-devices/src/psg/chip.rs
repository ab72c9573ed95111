//! PSG chip: register file, mixer and output chain
//!
//! The chip is stepped at `clock / 8`; each output sample runs eight
//! oversampled positions through the interpolator and decimator. Every write
//! goes through the register file so reads always reflect what the CPU wrote.

use super::dc_filter::DcFilter;
use super::fir::{CubicInterpolator, FirDecimator};
use super::generators::{EnvelopeGenerator, NoiseGenerator, ToneGenerator, NUM_CHANNELS};
use super::tables::DECIMATE_FACTOR;
use super::ChipFamily;
use crate::{DeviceError, Result};

/// Default PSG master clock (2 MHz)
pub const DEFAULT_CLOCK_HZ: f64 = 2_000_000.0;

/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of PSG registers
pub const NUM_REGISTERS: usize = 16;

/// Master clock cycles per internal step
const CLOCK_DIVIDER: f64 = 8.0;

/// Mixer flags and tone counter for one channel
#[derive(Clone, Debug, Default)]
struct ToneChannel {
    tone: ToneGenerator,
    tone_off: bool,
    noise_off: bool,
    envelope_on: bool,
    volume: u8,
}

/// Programmable sound generator (AY-3-8910 / YM2149)
///
/// One instance is one chip; stereo boards own two of them.
#[derive(Clone)]
pub struct Psg {
    family: ChipFamily,
    clock_hz: f64,
    sample_rate: u32,
    channels: [ToneChannel; NUM_CHANNELS],
    noise: NoiseGenerator,
    envelope: EnvelopeGenerator,
    regs: [u8; NUM_REGISTERS],
    selected: u8,
    /// Internal steps per oversampled position (< 1)
    step: f64,
    /// Fractional position between internal steps
    x: f64,
    interpolator: CubicInterpolator,
    decimator: FirDecimator,
    dc: DcFilter,
    sample: f64,
}

impl Psg {
    /// Create a chip and put it in its power-on state.
    ///
    /// Fails if the sample rate is too low to oversample the clock.
    pub fn new(family: ChipFamily, clock_hz: f64, sample_rate: u32) -> Result<Self> {
        let mut psg = Psg {
            family,
            clock_hz,
            sample_rate,
            channels: Default::default(),
            noise: NoiseGenerator::new(),
            envelope: EnvelopeGenerator::new(),
            regs: [0; NUM_REGISTERS],
            selected: 0,
            step: 0.0,
            x: 0.0,
            interpolator: CubicInterpolator::default(),
            decimator: FirDecimator::new(),
            dc: DcFilter::new(),
            sample: 0.0,
        };
        psg.configure(family, clock_hz, sample_rate)?;
        Ok(psg)
    }

    /// Reset all state for a new clock/sample rate pair.
    ///
    /// Leaves channel A with tone enabled, noise off and full volume; the
    /// other channels are silent.
    pub fn configure(&mut self, family: ChipFamily, clock_hz: f64, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(DeviceError::Config("PSG sample rate must be > 0".into()));
        }
        let step = clock_hz / (sample_rate as f64 * CLOCK_DIVIDER * DECIMATE_FACTOR as f64);
        if !(step > 0.0 && step < 1.0) {
            return Err(DeviceError::Config(format!(
                "PSG clock {clock_hz} Hz is out of range for {sample_rate} Hz output"
            )));
        }

        self.family = family;
        self.clock_hz = clock_hz;
        self.sample_rate = sample_rate;
        self.step = step;
        self.x = 0.0;
        self.channels = Default::default();
        self.noise = NoiseGenerator::new();
        self.envelope = EnvelopeGenerator::new();
        self.regs = [0; NUM_REGISTERS];
        self.selected = 0;
        self.interpolator = CubicInterpolator::default();
        self.decimator.reset();
        self.dc.reset();
        self.sample = 0.0;

        self.write_register(7, 0x08);
        self.write_register(8, 0x0f);
        Ok(())
    }

    /// Restart the chip with its current configuration
    pub fn reset(&mut self) -> Result<()> {
        self.configure(self.family, self.clock_hz, self.sample_rate)
    }

    /// Chip family (selects the DAC curve)
    pub fn family(&self) -> ChipFamily {
        self.family
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Internal steps per oversampled position
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Latch a register number (data port writes go there)
    pub fn select(&mut self, register: u8) {
        self.selected = register & 0x0f;
    }

    /// Currently latched register number
    pub fn selected(&self) -> u8 {
        self.selected
    }

    /// Write to the latched register
    pub fn write_data(&mut self, value: u8) {
        self.write_register(self.selected, value);
    }

    /// Write to a chip port: even ports latch a register, odd ports write data.
    pub fn write_port(&mut self, port: u8, value: u8) {
        if port & 1 == 0 {
            self.select(value);
        } else {
            self.write_data(value);
        }
    }

    /// Write a register and apply its effect.
    ///
    /// | Register | Effect |
    /// |---|---|
    /// | R0-R5 | tone fine/coarse (12-bit) |
    /// | R6 | noise period (5-bit) |
    /// | R7 | bits 0-2 tone off, bits 3-5 noise off |
    /// | R8-R10 | bit 4 envelope on, bits 0-3 volume |
    /// | R11/R12 | envelope period (16-bit) |
    /// | R13 | envelope shape (restarts the envelope) |
    /// | R14/R15 | I/O ports, stored only |
    pub fn write_register(&mut self, register: u8, value: u8) {
        let reg = (register & 0x0f) as usize;
        log::trace!("PSG R{reg} <- {value:02X}");

        match reg {
            0..=5 => {
                let channel = reg >> 1;
                self.regs[reg] = if reg & 1 == 1 { value & 0x0f } else { value };
                let period =
                    ((self.regs[channel * 2 + 1] as u32) << 8) | self.regs[channel * 2] as u32;
                self.channels[channel].tone.set_period(period);
            }
            6 => {
                self.regs[reg] = value & 0x1f;
                self.noise.set_period(value as u32);
            }
            7 => {
                self.regs[reg] = value;
                for (i, ch) in self.channels.iter_mut().enumerate() {
                    ch.tone_off = value & (1 << i) != 0;
                    ch.noise_off = value & (1 << (i + 3)) != 0;
                }
            }
            8..=10 => {
                self.regs[reg] = value & 0x1f;
                let ch = &mut self.channels[reg - 8];
                ch.envelope_on = value & 0x10 != 0;
                ch.volume = value & 0x0f;
            }
            11 | 12 => {
                self.regs[reg] = value;
                let period = ((self.regs[12] as u32) << 8) | self.regs[11] as u32;
                self.envelope.set_period(period);
            }
            13 => {
                self.regs[reg] = value & 0x0f;
                self.envelope.set_shape(value);
            }
            _ => {
                self.regs[reg] = value;
            }
        }
    }

    /// Read back a register as last written
    pub fn read_register(&self, register: u8) -> u8 {
        self.regs[(register & 0x0f) as usize]
    }

    /// Snapshot of the register file
    pub fn registers(&self) -> [u8; NUM_REGISTERS] {
        self.regs
    }

    /// Set a channel's tone period (0 acts as 1)
    pub fn set_tone(&mut self, channel: usize, period: u16) {
        if channel >= NUM_CHANNELS {
            return;
        }
        let reg = (channel * 2) as u8;
        self.write_register(reg, (period & 0xff) as u8);
        self.write_register(reg + 1, (period >> 8) as u8);
    }

    /// Set the noise period (0 acts as 1)
    pub fn set_noise(&mut self, period: u8) {
        self.write_register(6, period);
    }

    /// Set a channel's mixer flags
    pub fn set_mixer(&mut self, channel: usize, tone_off: bool, noise_off: bool, envelope_on: bool) {
        if channel >= NUM_CHANNELS {
            return;
        }
        let mut mixer = self.regs[7] & !((1 << channel) | (1 << (channel + 3)));
        if tone_off {
            mixer |= 1 << channel;
        }
        if noise_off {
            mixer |= 1 << (channel + 3);
        }
        self.write_register(7, mixer);

        let amplitude_reg = 8 + channel;
        let amplitude = (self.regs[amplitude_reg] & 0x0f) | if envelope_on { 0x10 } else { 0 };
        self.write_register(amplitude_reg as u8, amplitude);
    }

    /// Set a channel's fixed volume (0-15)
    pub fn set_volume(&mut self, channel: usize, volume: u8) {
        if channel >= NUM_CHANNELS {
            return;
        }
        let reg = 8 + channel;
        let value = (self.regs[reg] & 0x10) | (volume & 0x0f);
        self.write_register(reg as u8, value);
    }

    /// Set the envelope period (0 acts as 1)
    pub fn set_envelope(&mut self, period: u16) {
        self.write_register(11, (period & 0xff) as u8);
        self.write_register(12, (period >> 8) as u8);
    }

    /// Select and restart an envelope shape
    pub fn set_envelope_shape(&mut self, shape: u8) {
        self.write_register(13, shape);
    }

    /// Current envelope level (0-31)
    pub fn envelope_level(&self) -> u8 {
        self.envelope.level()
    }

    /// Advance all generators by one internal step and mix the channels.
    fn update_mixer(&mut self) -> f64 {
        let noise = self.noise.tick();
        let envelope = self.envelope.tick();
        let dac = self.family.dac_table();

        let mut sample = 0.0;
        for ch in &mut self.channels {
            let tone = ch.tone.tick();
            let gate = (tone | ch.tone_off as u8) & (noise | ch.noise_off as u8);
            let level = if ch.envelope_on {
                envelope
            } else {
                ch.volume * 2 + 1
            };
            sample += dac[(gate * level) as usize];
        }
        sample
    }

    /// Produce the next output sample (before DC removal).
    pub fn process(&mut self) -> f64 {
        let mut block = [0.0; DECIMATE_FACTOR];
        for slot in block.iter_mut().rev() {
            self.x += self.step;
            if self.x >= 1.0 {
                self.x -= 1.0;
                let mixed = self.update_mixer();
                self.interpolator.push(mixed);
            }
            *slot = self.interpolator.eval(self.x);
        }
        self.sample = self.decimator.push_block(&block);
        self.sample
    }

    /// Remove the DC offset from the last processed sample.
    pub fn remove_dc(&mut self) -> f64 {
        self.sample = self.dc.process(self.sample);
        self.sample
    }

    /// `process` followed by `remove_dc`
    pub fn next_sample(&mut self) -> f64 {
        self.process();
        self.remove_dc()
    }

    /// Last output sample
    pub fn sample(&self) -> f64 {
        self.sample
    }
}

impl std::fmt::Debug for Psg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Psg")
            .field("family", &self.family)
            .field("clock_hz", &self.clock_hz)
            .field("sample_rate", &self.sample_rate)
            .field("regs", &self.regs)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
