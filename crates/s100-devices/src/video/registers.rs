//! Dazzler register layouts
//!
//! Each register has exactly one `decode`/`encode` pair; nothing else in the
//! crate picks bits out of the raw bytes.

use bitflags::bitflags;

bitflags! {
    /// Control register (output) flag bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlBits: u8 {
        /// Display on
        const ON = 0x80;
    }
}

bitflags! {
    /// Format register (output) flag bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FormatBits: u8 {
        /// High resolution x4 mode (4 monochrome pixels per byte)
        const X4 = 0x40;
        /// 2K memory, 32 bytes per DMA group
        const WIDE = 0x20;
        /// Color palette (else grays)
        const COLOR = 0x10;
    }
}

bitflags! {
    /// Flags register (input)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Toggles at the end of every DMA group
        const LINE_PARITY = 0x80;
        /// Set while the beam is *not* in vertical blank
        const NOT_VBLANK = 0x40;
        /// Unused bits, read as 1
        const UNUSED = 0x3f;
    }
}

impl StatusFlags {
    /// Value during vertical blank: parity cleared, blank asserted
    pub const VBLANK: StatusFlags = StatusFlags::UNUSED;
}

/// Decoded control register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Control {
    /// DMA page (512-byte units)
    pub page: u8,
    /// Display on
    pub on: bool,
}

impl Control {
    /// Decode a control port byte
    pub fn decode(value: u8) -> Self {
        Control {
            page: value & 0x7f,
            on: ControlBits::from_bits_truncate(value).contains(ControlBits::ON),
        }
    }

    /// Encode back to the port byte
    pub fn encode(self) -> u8 {
        let bits = if self.on {
            ControlBits::ON
        } else {
            ControlBits::empty()
        };
        bits.bits() | (self.page & 0x7f)
    }

    /// Start of display memory
    pub fn dma_address(self) -> u16 {
        (self.page as u16) << 9
    }
}

/// Decoded format register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Format {
    /// x4 monochrome mode
    pub x4: bool,
    /// 2K memory, 32 bytes per DMA group
    pub wide: bool,
    /// Color palette (else grays)
    pub color: bool,
    /// Foreground palette index for x4 mode
    pub foreground: u8,
}

impl Format {
    /// Decode a format port byte
    pub fn decode(value: u8) -> Self {
        let bits = FormatBits::from_bits_truncate(value);
        Format {
            x4: bits.contains(FormatBits::X4),
            wide: bits.contains(FormatBits::WIDE),
            color: bits.contains(FormatBits::COLOR),
            foreground: value & 0x0f,
        }
    }

    /// Encode back to the port byte
    pub fn encode(self) -> u8 {
        let mut bits = FormatBits::empty();
        bits.set(FormatBits::X4, self.x4);
        bits.set(FormatBits::WIDE, self.wide);
        bits.set(FormatBits::COLOR, self.color);
        bits.bits() | (self.foreground & 0x0f)
    }

    /// Bytes fetched per DMA group
    pub fn bytes_per_group(self) -> usize {
        if self.wide {
            32
        } else {
            16
        }
    }

    /// DMA groups per frame
    pub fn groups_per_frame(self) -> usize {
        if self.wide {
            64
        } else {
            32
        }
    }

    /// Scanlines covered by one DMA group
    pub fn lines_per_group(self) -> usize {
        super::dazzler::SCANLINES / self.groups_per_frame()
    }

    /// Width of one pixel at the given scale
    pub fn pixel_size(self, scale: u32) -> u32 {
        let span = if self.x4 { 192 } else { 384 };
        (span / self.groups_per_frame()) as u32 * scale
    }
}
