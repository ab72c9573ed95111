//! CPU clock and DMA memory collaborators
//!
//! The CPU emulation is external to this crate. Devices only see it through
//! these two traits: a tick counter with a run state, and byte-wide DMA reads.
//! Both are shared between the CPU thread and host callback threads, so they
//! take `&self` and require `Send + Sync`.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// View of the emulated CPU's clock.
pub trait CpuClock: Send + Sync {
    /// Current emulated clock value (T-states since power-on).
    fn ticks(&self) -> u64;

    /// Nominal CPU frequency in Hz.
    fn frequency_hz(&self) -> u64;

    /// Whether the CPU is in continuous-run state.
    ///
    /// Pacing loops abort as soon as this turns false.
    fn is_running(&self) -> bool;

    /// Charge bus-master cycles to the CPU scheduler.
    ///
    /// Called by DMA devices to model bus arbitration slowdown. The default
    /// implementation ignores the charge.
    fn charge_bus_cycles(&self, _ticks: u64) {}
}

/// Byte-wide DMA access to emulated memory.
pub trait DmaMemory: Send + Sync {
    /// Read one byte. Unmapped addresses return whatever the memory model
    /// defines (typically 0xFF).
    fn dma_read(&self, address: u16) -> u8;
}

/// Clock driven explicitly by the caller
///
/// Used by the CLI harness and by tests that need deterministic timing.
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicU64,
    frequency_hz: u64,
    running: AtomicBool,
    bus_ticks: AtomicU64,
}

impl ManualClock {
    /// Create a running clock at tick zero with the given frequency.
    pub fn new(frequency_hz: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frequency_hz,
            running: AtomicBool::new(true),
            bus_ticks: AtomicU64::new(0),
        }
    }

    /// Advance the clock by `ticks` and return the new value.
    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks.fetch_add(ticks, Ordering::AcqRel) + ticks
    }

    /// Set the clock to an absolute value.
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Release);
    }

    /// Change the CPU run state.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Total bus-master ticks charged so far.
    pub fn bus_ticks_charged(&self) -> u64 {
        self.bus_ticks.load(Ordering::Acquire)
    }
}

impl CpuClock for ManualClock {
    fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn charge_bus_cycles(&self, ticks: u64) {
        self.bus_ticks.fetch_add(ticks, Ordering::AcqRel);
    }
}

/// Flat 64K memory implementing [`DmaMemory`]
pub struct Ram64k {
    memory: RwLock<Vec<u8>>,
}

impl Ram64k {
    /// Create zero-filled memory.
    pub fn new() -> Self {
        Self {
            memory: RwLock::new(vec![0; 0x10000]),
        }
    }

    /// Write one byte.
    pub fn write(&self, address: u16, value: u8) {
        self.memory.write()[address as usize] = value;
    }

    /// Copy `data` starting at `address`, wrapping at the top of memory.
    pub fn load(&self, address: u16, data: &[u8]) {
        let mut memory = self.memory.write();
        for (i, &byte) in data.iter().enumerate() {
            memory[address.wrapping_add(i as u16) as usize] = byte;
        }
    }
}

impl Default for Ram64k {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaMemory for Ram64k {
    fn dma_read(&self, address: u16) -> u8 {
        self.memory.read()[address as usize]
    }
}

impl std::fmt::Debug for Ram64k {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ram64k").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(4_000_000);
        assert_eq!(clock.ticks(), 0);
        assert_eq!(clock.advance(100), 100);
        assert_eq!(clock.advance(50), 150);
        clock.set(10);
        assert_eq!(clock.ticks(), 10);
        assert_eq!(clock.frequency_hz(), 4_000_000);
    }

    #[test]
    fn test_manual_clock_run_state_and_bus_charge() {
        let clock = ManualClock::new(2_000_000);
        assert!(clock.is_running());
        clock.set_running(false);
        assert!(!clock.is_running());

        clock.charge_bus_cycles(96);
        clock.charge_bus_cycles(48);
        assert_eq!(clock.bus_ticks_charged(), 144);
    }

    #[test]
    fn test_ram_load_wraps() {
        let ram = Ram64k::new();
        ram.load(0xFFFF, &[1, 2, 3]);
        assert_eq!(ram.dma_read(0xFFFF), 1);
        assert_eq!(ram.dma_read(0x0000), 2);
        assert_eq!(ram.dma_read(0x0001), 3);

        ram.write(0x1234, 0xAB);
        assert_eq!(ram.dma_read(0x1234), 0xAB);
    }
}
