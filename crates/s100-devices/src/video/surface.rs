//! Drawing surface for raster scan-out
//!
//! Scan-out only ever clears the canvas and fills axis-aligned rectangles, so
//! that is the whole interface. [`FrameBuffer`] is the in-memory
//! implementation used by the CLI capture and by tests; a windowing host
//! would implement [`Surface`] over its own canvas.

use crate::{DeviceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 24-bit color
///
/// Serialized as a `rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Black
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Build a color from components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Build a color from `0xRRGGBB`
    pub const fn from_u32(rgb: u32) -> Self {
        Rgb {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }

    /// Pack as `0x00RRGGBB`
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Scale every component by `level / 255`
    pub fn scaled(self, level: u8) -> Self {
        let scale = |c: u8| (c as u32 * level as u32 / 255) as u8;
        Rgb::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl FromStr for Rgb {
    type Err = DeviceError;

    /// Parse `rrggbb`, optionally prefixed by `#` or `0x`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim();
        let hex = hex
            .strip_prefix('#')
            .or_else(|| hex.strip_prefix("0x"))
            .unwrap_or(hex);
        if hex.len() != 6 {
            return Err(DeviceError::Config(format!("invalid color '{s}'")));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb::from_u32)
            .map_err(|_| DeviceError::Config(format!("invalid color '{s}'")))
    }
}

impl TryFrom<String> for Rgb {
    type Error = DeviceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Target of scan-out draw calls
pub trait Surface {
    /// Fill the whole canvas with `color`.
    fn clear(&mut self, color: Rgb);

    /// Fill a rectangle; parts outside the canvas are clipped.
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb);

    /// Make the finished frame visible.
    fn present(&mut self) {}
}

/// In-memory `0x00RRGGBB` canvas
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    presented: u64,
}

impl FrameBuffer {
    /// Create a black canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
            presented: 0,
        }
    }

    /// Canvas width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixels
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Color at `(x, y)`, `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Rgb::from_u32(
            self.pixels[y as usize * self.width as usize + x as usize],
        ))
    }

    /// Number of frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// Pixels as packed RGBA bytes (alpha 0xFF)
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &px in &self.pixels {
            let c = Rgb::from_u32(px);
            out.extend_from_slice(&[c.r, c.g, c.b, 0xff]);
        }
        out
    }
}

impl Surface for FrameBuffer {
    fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color.to_u32());
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        if x >= x_end || y >= y_end {
            return;
        }
        let value = color.to_u32();
        let stride = self.width as usize;
        for row in y as usize..y_end as usize {
            self.pixels[row * stride + x as usize..row * stride + x_end as usize].fill(value);
        }
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("presented", &self.presented)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex_round_trip() {
        let green: Rgb = "00ff00".parse().expect("hex");
        assert_eq!(green, Rgb::new(0, 255, 0));
        assert_eq!(green.to_string(), "00ff00");
        assert_eq!("#FF8000".parse::<Rgb>().expect("hex"), Rgb::from_u32(0xff8000));
        assert!("fff".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_rgb_scaled() {
        let c = Rgb::new(255, 128, 0);
        assert_eq!(c.scaled(255), c);
        assert_eq!(c.scaled(0), Rgb::BLACK);
        assert_eq!(c.scaled(0x88), Rgb::new(0x88, 0x44, 0));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.fill_rect(2, 2, 10, 10, Rgb::new(1, 2, 3));
        assert_eq!(fb.pixel(3, 3), Some(Rgb::new(1, 2, 3)));
        assert_eq!(fb.pixel(1, 1), Some(Rgb::BLACK));
        assert_eq!(fb.pixel(4, 0), None);

        fb.fill_rect(8, 8, 1, 1, Rgb::new(9, 9, 9)); // fully outside
        fb.clear(Rgb::new(5, 5, 5));
        assert!(fb.pixels().iter().all(|&p| p == 0x050505));
    }

    #[test]
    fn test_rgba_export() {
        let mut fb = FrameBuffer::new(2, 1);
        fb.fill_rect(1, 0, 1, 1, Rgb::new(0x10, 0x20, 0x30));
        fb.present();
        assert_eq!(fb.to_rgba8(), vec![0, 0, 0, 0xff, 0x10, 0x20, 0x30, 0xff]);
        assert_eq!(fb.frames_presented(), 1);
    }
}
