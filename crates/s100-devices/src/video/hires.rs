//! Vector Graphic HiRes raster scan-out
//!
//! A memory-mapped frame buffer without ports: the board is on from power-up
//! and scans a fixed 15K window at 60 Hz.
//!
//! - Bilevel: 256×240, one bit per pixel, drawn as 2×2 blocks
//! - Halftone: 128×120, one nibble per pixel, drawn as 4×4 blocks

use super::surface::{Rgb, Surface};
use crate::bus::DmaMemory;
use crate::config::{HiResConfig, HiResMode};
use crate::host::{DisplayDevice, FrameOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Canvas width in pixels
pub const CANVAS_WIDTH: u32 = 512;

/// Canvas height in pixels
pub const CANVAS_HEIGHT: u32 = 480;

/// Bytes per scanline in memory
const BYTES_PER_ROW: usize = 64;

const FRAME_INTERVAL: Duration = Duration::from_micros(16_666);

/// Bilevel bit order per subrow, left to right
const BILEVEL_MASKS: [[u8; 4]; 2] = [[0x80, 0x40, 0x08, 0x04], [0x20, 0x10, 0x02, 0x01]];

/// Vector Graphic HiRes
pub struct HiRes {
    config: HiResConfig,
    memory: Arc<dyn DmaMemory>,
    on: AtomicBool,
}

impl HiRes {
    /// Create the board, switched on
    pub fn new(config: HiResConfig, memory: Arc<dyn DmaMemory>) -> Self {
        log::debug!(
            "HiRes {:?} at {:04x}, foreground {}",
            config.mode,
            config.address,
            config.foreground
        );
        Self {
            config,
            memory,
            on: AtomicBool::new(true),
        }
    }

    /// Board configuration
    pub fn config(&self) -> &HiResConfig {
        &self.config
    }

    /// Whether the board is scanning
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    /// Front panel power off
    pub fn power_off(&self) {
        self.on.store(false, Ordering::Release);
    }

    /// Power back on
    pub fn power_on(&self) {
        self.on.store(true, Ordering::Release);
    }

    /// Scan one frame into `surface`
    pub fn refresh(&self, surface: &mut dyn Surface) -> FrameOutcome {
        surface.clear(Rgb::BLACK);
        let outcome = if self.is_on() {
            match self.config.mode {
                HiResMode::Bilevel => self.draw_bilevel(surface),
                HiResMode::Halftone => self.draw_halftone(surface),
            }
            FrameOutcome::Drawn
        } else {
            FrameOutcome::Blank
        };
        surface.present();
        outcome
    }

    fn draw_bilevel(&self, surface: &mut dyn Surface) {
        let fg = self.config.foreground;
        let mut addr = self.config.address;
        for scanline in 0..(CANVAS_HEIGHT / 2) {
            let subrow = (scanline % 2) as usize;
            for bytepos in 0..BYTES_PER_ROW {
                let byte = self.memory.dma_read(addr.wrapping_add(bytepos as u16));
                for (k, mask) in BILEVEL_MASKS[subrow].iter().enumerate() {
                    if byte & mask != 0 {
                        let x = (bytepos * 4 + k) as u32 * 2;
                        surface.fill_rect(x, scanline * 2, 2, 2, fg);
                    }
                }
            }
            // Two scanlines share one row of bytes
            if subrow == 1 {
                addr = addr.wrapping_add(BYTES_PER_ROW as u16);
            }
        }
    }

    fn draw_halftone(&self, surface: &mut dyn Surface) {
        let fg = self.config.foreground;
        let mut addr = self.config.address;
        for row in 0..(CANVAS_HEIGHT / 4) {
            for bytepos in 0..BYTES_PER_ROW {
                let byte = self.memory.dma_read(addr.wrapping_add(bytepos as u16));
                let x = (bytepos * 2) as u32 * 4;
                surface.fill_rect(x, row * 4, 4, 4, fg.scaled((byte >> 4) * 0x11));
                surface.fill_rect(x + 4, row * 4, 4, 4, fg.scaled((byte & 0x0f) * 0x11));
            }
            addr = addr.wrapping_add(BYTES_PER_ROW as u16);
        }
    }
}

impl DisplayDevice for HiRes {
    fn canvas_size(&self) -> (u32, u32) {
        (CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    fn frame_interval(&self) -> Duration {
        FRAME_INTERVAL
    }

    fn open(&self) {
        log::info!("HiRes display open");
    }

    fn close(&self) {
        log::info!("HiRes display closed");
    }

    fn produce_frame(&self, surface: &mut dyn Surface) -> FrameOutcome {
        self.refresh(surface)
    }
}

impl std::fmt::Debug for HiRes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiRes")
            .field("config", &self.config)
            .field("on", &self.is_on())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Ram64k;
    use crate::video::FrameBuffer;

    fn board(mode: HiResMode) -> (HiRes, Arc<Ram64k>) {
        let ram = Arc::new(Ram64k::new());
        let config = HiResConfig {
            mode,
            ..HiResConfig::default()
        };
        (HiRes::new(config, ram.clone()), ram)
    }

    #[test]
    fn test_bilevel_bit_order() {
        let (hires, ram) = board(HiResMode::Bilevel);
        ram.write(0xe000, 0x80 | 0x04 | 0x01);
        let mut fb = FrameBuffer::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        assert_eq!(hires.refresh(&mut fb), FrameOutcome::Drawn);

        let green = Rgb::new(0, 255, 0);
        // Scanline 0 (subrow 0): 0x80 -> pixel 0, 0x04 -> pixel 3
        assert_eq!(fb.pixel(0, 0), Some(green));
        assert_eq!(fb.pixel(1, 1), Some(green));
        assert_eq!(fb.pixel(2, 0), Some(Rgb::BLACK));
        assert_eq!(fb.pixel(6, 0), Some(green));
        // Scanline 1 (subrow 1): 0x01 -> pixel 3
        assert_eq!(fb.pixel(0, 2), Some(Rgb::BLACK));
        assert_eq!(fb.pixel(6, 2), Some(green));
        // Scanline 2 reads the next row of bytes
        assert_eq!(fb.pixel(0, 4), Some(Rgb::BLACK));
    }

    #[test]
    fn test_bilevel_rows_advance_every_two_scanlines() {
        let (hires, ram) = board(HiResMode::Bilevel);
        // Last row of the window, rightmost byte
        ram.write(0xe000 + 119 * 64 + 63, 0xff);
        let mut fb = FrameBuffer::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        hires.refresh(&mut fb);
        assert_eq!(fb.pixel(511, 479), Some(Rgb::new(0, 255, 0)));
        assert_eq!(fb.pixel(511, 475), Some(Rgb::BLACK));
    }

    #[test]
    fn test_halftone_shades() {
        let (hires, ram) = board(HiResMode::Halftone);
        ram.write(0xe000, 0xf8);
        ram.write(0xe040, 0x01);
        let mut fb = FrameBuffer::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        hires.refresh(&mut fb);

        // High nibble first
        assert_eq!(fb.pixel(0, 0), Some(Rgb::new(0, 0xff, 0)));
        assert_eq!(fb.pixel(4, 3), Some(Rgb::new(0, 0x88, 0)));
        assert_eq!(fb.pixel(8, 0), Some(Rgb::BLACK));
        // Second row of bytes starts at scanline 4
        assert_eq!(fb.pixel(4, 4), Some(Rgb::new(0, 0x11, 0)));
    }

    #[test]
    fn test_power_off_blanks() {
        let (hires, ram) = board(HiResMode::Bilevel);
        ram.write(0xe000, 0xff);
        assert!(hires.is_on());
        hires.power_off();
        let mut fb = FrameBuffer::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        assert_eq!(hires.produce_frame(&mut fb), FrameOutcome::Blank);
        assert!(fb.pixels().iter().all(|&p| p == 0));
        hires.power_on();
        assert_eq!(hires.produce_frame(&mut fb), FrameOutcome::Drawn);
    }

    #[test]
    fn test_display_geometry() {
        let (hires, _) = board(HiResMode::Bilevel);
        assert_eq!(hires.canvas_size(), (512, 480));
        assert_eq!(hires.frame_interval(), Duration::from_micros(16_666));
    }
}
