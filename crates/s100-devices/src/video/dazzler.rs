//! Cromemco Dazzler raster scan-out
//!
//! The board DMAs 512 bytes (2K in wide mode) from a 512-byte aligned page
//! and paints a 384×384 canvas, either as 2 pixels per byte through a
//! 16-entry palette or, in x4 mode, as 4 monochrome pixels per byte.
//!
//! The CPU side only touches three ports (`ctl_out`, `format_out`,
//! `flags_in`); everything else happens in [`Dazzler::refresh`], called from
//! whatever trigger the host runs (see [`super::trigger`]).
//!
//! With line sync enabled the scan holds each DMA group until the emulated
//! CPU clock has passed the group's row duration, so software polling the
//! line parity bit sees it toggle at the real hardware rate.

use super::pacing::{Sleeper, ThreadSleeper, TickPacer, WaitOutcome};
use super::registers::{Control, Format, StatusFlags};
use super::surface::{Rgb, Surface};
use crate::bus::{CpuClock, DmaMemory};
use crate::config::DazzlerConfig;
use crate::host::{DisplayDevice, FrameOutcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scanlines per full frame
pub const SCANLINES: usize = 384;

/// Canvas edge at scale 1
pub const CANVAS_SIZE: u32 = SCANLINES as u32;

/// Horizontal line rate used for row timing
const LINE_RATE_HZ: u64 = 15_980;

/// Vertical blank length in emulated time
const VBLANK_US: u64 = 4_000;

/// Refresh interval for a dedicated worker (62 Hz field rate)
const FRAME_INTERVAL: Duration = Duration::from_micros(16_129);

/// Bus cycles charged per DMA byte under line sync
const BUS_TICKS_PER_BYTE: u64 = 3;

/// Color palette: half intensity in 0-7, full intensity in 8-15
pub const COLORS: [Rgb; 16] = [
    Rgb::from_u32(0x000000),
    Rgb::from_u32(0x800000),
    Rgb::from_u32(0x008000),
    Rgb::from_u32(0x808000),
    Rgb::from_u32(0x000080),
    Rgb::from_u32(0x800080),
    Rgb::from_u32(0x008080),
    Rgb::from_u32(0x808080),
    Rgb::from_u32(0x000000),
    Rgb::from_u32(0xff0000),
    Rgb::from_u32(0x00ff00),
    Rgb::from_u32(0xffff00),
    Rgb::from_u32(0x0000ff),
    Rgb::from_u32(0xff00ff),
    Rgb::from_u32(0x00ffff),
    Rgb::from_u32(0xffffff),
];

/// Palette entry for `index` (0-15) in color or gray mode
pub fn palette(index: u8, color: bool) -> Rgb {
    let index = index & 0x0f;
    if color {
        COLORS[index as usize]
    } else {
        let level = index * 0x11;
        Rgb::new(level, level, level)
    }
}

/// Which scanlines a frame covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Every scanline (non-interlaced)
    Full,
    /// Even scanlines
    Even,
    /// Odd scanlines
    Odd,
}

impl Field {
    fn first_line(self) -> usize {
        match self {
            Field::Odd => 1,
            _ => 0,
        }
    }

    fn step(self) -> usize {
        match self {
            Field::Full => 1,
            _ => 2,
        }
    }
}

/// What the last refresh scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Field drawn
    pub field: Field,
    /// Scanlines painted
    pub scanlines: u32,
    /// DMA groups fetched
    pub dma_groups: u32,
    /// Line parity toggles
    pub parity_toggles: u32,
    /// Bus cycles charged to the CPU
    pub bus_ticks: u64,
    /// A pacing wait was cut short because the CPU stopped
    pub pacing_aborted: bool,
}

struct ScanState {
    field: Field,
    pacer: TickPacer,
    last_report: Option<FrameReport>,
}

/// Cromemco Dazzler
pub struct Dazzler {
    config: DazzlerConfig,
    clock: Arc<dyn CpuClock>,
    memory: Arc<dyn DmaMemory>,
    control: AtomicU8,
    format: AtomicU8,
    flags: AtomicU8,
    display_open: AtomicBool,
    scan: Mutex<ScanState>,
}

impl Dazzler {
    /// Create a powered-off board that paces with real sleeps
    pub fn new(config: DazzlerConfig, clock: Arc<dyn CpuClock>, memory: Arc<dyn DmaMemory>) -> Self {
        Self::with_sleeper(config, clock, memory, Arc::new(ThreadSleeper))
    }

    /// Create a board with a custom pacing sleeper
    pub fn with_sleeper(
        config: DazzlerConfig,
        clock: Arc<dyn CpuClock>,
        memory: Arc<dyn DmaMemory>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let field = if config.interlaced {
            Field::Even
        } else {
            Field::Full
        };
        Self {
            config,
            clock,
            memory,
            control: AtomicU8::new(0),
            format: AtomicU8::new(0),
            flags: AtomicU8::new(StatusFlags::VBLANK.bits()),
            display_open: AtomicBool::new(false),
            scan: Mutex::new(ScanState {
                field,
                pacer: TickPacer::new(sleeper),
                last_report: None,
            }),
        }
    }

    /// Board configuration
    pub fn config(&self) -> &DazzlerConfig {
        &self.config
    }

    /// Control port write: DMA page and on/off
    pub fn ctl_out(&self, value: u8) {
        let new = Control::decode(value);
        let old = Control::decode(self.control.swap(value, Ordering::AcqRel));
        if new.on != old.on {
            log::info!(
                "Dazzler {} (DMA address {:04x})",
                if new.on { "on" } else { "off" },
                new.dma_address()
            );
        } else {
            log::trace!("Dazzler ctl {:02x}", value);
        }
    }

    /// Format port write
    pub fn format_out(&self, value: u8) {
        log::trace!("Dazzler format {:02x}", value);
        self.format.store(value, Ordering::Release);
    }

    /// Flags port read; 0xFF until a display has been opened
    pub fn flags_in(&self) -> u8 {
        if self.display_open.load(Ordering::Acquire) {
            self.flags.load(Ordering::Acquire)
        } else {
            0xff
        }
    }

    /// Current control register
    pub fn control(&self) -> Control {
        Control::decode(self.control.load(Ordering::Acquire))
    }

    /// Current format register
    pub fn format(&self) -> Format {
        Format::decode(self.format.load(Ordering::Acquire))
    }

    /// Whether the board is switched on
    pub fn is_on(&self) -> bool {
        self.control().on
    }

    /// Front panel reset/power off
    pub fn power_off(&self) {
        self.control.store(0, Ordering::Release);
        self.flags.store(StatusFlags::VBLANK.bits(), Ordering::Release);
        log::debug!("Dazzler powered off");
    }

    /// Discrete pixel scale applied to the canvas
    pub fn scale(&self) -> u32 {
        if self.config.discrete_scale {
            (self.config.window_size / CANVAS_SIZE).max(1)
        } else {
            1
        }
    }

    /// Report of the last scanned frame
    pub fn last_report(&self) -> Option<FrameReport> {
        self.scan.lock().last_report
    }

    /// Scan one frame into `surface`, then hold vertical blank.
    ///
    /// Returns the frame report when the board is on. An off board only
    /// clears the surface; the flags and the CPU clock are left alone.
    pub fn refresh(&self, surface: &mut dyn Surface) -> Option<FrameReport> {
        let mut scan = self.scan.lock();
        surface.clear(Rgb::BLACK);
        if self.is_on() {
            if self.config.interlaced {
                scan.field = match scan.field {
                    Field::Odd => Field::Even,
                    _ => Field::Odd,
                };
            }
            let report = self.draw_field(surface, scan.field, &scan.pacer);
            scan.last_report = Some(report);
            surface.present();
            self.vertical_blank(&scan.pacer);
            Some(report)
        } else {
            surface.present();
            None
        }
    }

    fn vertical_blank(&self, pacer: &TickPacer) {
        self.flags.store(StatusFlags::VBLANK.bits(), Ordering::Release);
        pacer.wait_emulated_us(self.clock.as_ref(), VBLANK_US);
        self.flags
            .fetch_or(StatusFlags::NOT_VBLANK.bits(), Ordering::AcqRel);
    }

    fn draw_field(&self, surface: &mut dyn Surface, field: Field, pacer: &TickPacer) -> FrameReport {
        let clock = self.clock.as_ref();
        let scale = self.scale();
        let step = field.step();
        let start = field.first_line();

        let mut report = FrameReport {
            field,
            scanlines: 0,
            dma_groups: 0,
            parity_toggles: 0,
            bus_ticks: 0,
            pacing_aborted: false,
        };
        let mut addr = self.control().dma_address();
        self.flags
            .fetch_and(!StatusFlags::LINE_PARITY.bits(), Ordering::AcqRel);

        let mut buffer = [0u8; 32];
        let mut line_in_group = 0usize;
        let mut row_deadline = 0u64;

        for scanline in (start..SCANLINES).step_by(step) {
            // Format may change mid-frame
            let format = self.format();
            let num_bytes = format.bytes_per_group();
            let lines_per_group = format.lines_per_group();
            let psize = format.pixel_size(scale);

            if line_in_group == 0 {
                row_deadline = clock.ticks() + lines_per_group as u64 * clock.frequency_hz() / LINE_RATE_HZ;
                for (bytepos, slot) in buffer.iter_mut().take(num_bytes).enumerate() {
                    let offset = quadrant_offset(bytepos, scanline, format.wide);
                    *slot = self.memory.dma_read(addr.wrapping_add(offset));
                }
                if self.config.line_sync {
                    let ticks = num_bytes as u64 * BUS_TICKS_PER_BYTE;
                    clock.charge_bus_cycles(ticks);
                    report.bus_ticks += ticks;
                }
                report.dma_groups += 1;
            }

            let y = scanline as u32 * scale;
            if format.x4 {
                let subrow = ((line_in_group + start) * 2 / lines_per_group).min(1);
                let fg = palette(format.foreground, format.color);
                for (bytepos, &byte) in buffer.iter().take(num_bytes).enumerate() {
                    for (k, mask) in X4_MASKS[subrow].iter().enumerate() {
                        if byte & mask != 0 {
                            let x = (bytepos * 4 + k) as u32;
                            surface.fill_rect(x * psize, y, psize, scale, fg);
                        }
                    }
                }
            } else {
                for (bytepos, &byte) in buffer.iter().take(num_bytes).enumerate() {
                    let x = (bytepos * 2) as u32;
                    surface.fill_rect(x * psize, y, psize, scale, palette(byte & 0x0f, format.color));
                    surface.fill_rect((x + 1) * psize, y, psize, scale, palette(byte >> 4, format.color));
                }
            }
            report.scanlines += 1;

            line_in_group += step;
            if line_in_group >= lines_per_group {
                if self.config.line_sync && pacer.wait_row(clock, row_deadline) == WaitOutcome::Aborted {
                    report.pacing_aborted = true;
                }
                addr = addr.wrapping_add(16);
                line_in_group = 0;
                self.flags
                    .fetch_xor(StatusFlags::LINE_PARITY.bits(), Ordering::AcqRel);
                report.parity_toggles += 1;
            }
        }
        report
    }
}

/// x4 bit order per subrow, left to right
const X4_MASKS: [[u8; 4]; 2] = [[0x01, 0x02, 0x10, 0x20], [0x04, 0x08, 0x40, 0x80]];

/// Memory offset of `bytepos` within a group.
///
/// Wide mode splits the 2K into four 512-byte quadrants. By the bottom half
/// the group address has already walked through one quadrant, so each half
/// adds 512.
fn quadrant_offset(bytepos: usize, scanline: usize, wide: bool) -> u16 {
    let mut offset = (bytepos % 16) as u16;
    if wide {
        if bytepos > 15 {
            offset += 512;
        }
        if scanline > 191 {
            offset += 512;
        }
    }
    offset
}

impl DisplayDevice for Dazzler {
    fn canvas_size(&self) -> (u32, u32) {
        let edge = CANVAS_SIZE * self.scale();
        (edge, edge)
    }

    fn frame_interval(&self) -> Duration {
        FRAME_INTERVAL
    }

    fn open(&self) {
        let slack = self.scan.lock().pacer.calibrate(self.clock.as_ref());
        self.display_open.store(true, Ordering::Release);
        log::info!("Dazzler display open ({} ticks per sleep)", slack);
    }

    fn close(&self) {
        self.display_open.store(false, Ordering::Release);
        log::info!("Dazzler display closed");
    }

    fn produce_frame(&self, surface: &mut dyn Surface) -> FrameOutcome {
        match self.refresh(surface) {
            Some(_) => FrameOutcome::Drawn,
            None => FrameOutcome::Blank,
        }
    }
}

impl std::fmt::Debug for Dazzler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dazzler")
            .field("config", &self.config)
            .field("control", &self.control())
            .field("format", &self.format())
            .field("flags", &self.flags.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
