//! Joystick axis/button latch
//!
//! The host input thread stores the latest axis positions and button states;
//! the CPU thread reads them back through the D+7A input ports. Everything is
//! a plain atomic, last value wins.
//!
//! | Port | Value |
//! |---|---|
//! | 0 | `!(buttons0 \| buttons1 << 4)`, active low |
//! | 1 | `x0 / 256` |
//! | 2 | `-y0 / 256` |
//! | 3 | `x1 / 256` |
//! | 4 | `-y1 / 256` |

use std::sync::atomic::{AtomicI16, AtomicU8, Ordering};

/// Number of joysticks the board reads
pub const NUM_JOYSTICKS: usize = 2;

/// Buttons reported per joystick
pub const BUTTONS_PER_JOYSTICK: u8 = 4;

/// Joystick axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal
    X,
    /// Vertical (host convention: positive is down)
    Y,
}

/// Input event delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickEvent {
    /// Axis moved to a signed 16-bit position
    Axis {
        /// Joystick index (0 or 1)
        joystick: usize,
        /// Which axis moved
        axis: Axis,
        /// New position
        value: i16,
    },
    /// Button pressed
    ButtonDown {
        /// Joystick index (0 or 1)
        joystick: usize,
        /// Button number
        button: u8,
    },
    /// Button released
    ButtonUp {
        /// Joystick index (0 or 1)
        joystick: usize,
        /// Button number
        button: u8,
    },
}

/// Lock-free latch of joystick state
#[derive(Debug, Default)]
pub struct JoystickLatch {
    axes: [[AtomicI16; 2]; NUM_JOYSTICKS],
    buttons: [AtomicU8; NUM_JOYSTICKS],
}

impl JoystickLatch {
    /// Create a latch with centered axes and no buttons held
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a host event. Events for unknown joysticks or buttons are ignored.
    pub fn handle(&self, event: JoystickEvent) {
        match event {
            JoystickEvent::Axis {
                joystick,
                axis,
                value,
            } => self.set_axis(joystick, axis, value),
            JoystickEvent::ButtonDown { joystick, button } => self.set_button(joystick, button, true),
            JoystickEvent::ButtonUp { joystick, button } => self.set_button(joystick, button, false),
        }
    }

    /// Store an axis position
    pub fn set_axis(&self, joystick: usize, axis: Axis, value: i16) {
        if let Some(axes) = self.axes.get(joystick) {
            axes[axis as usize].store(value, Ordering::Relaxed);
        }
    }

    /// Press or release a button
    pub fn set_button(&self, joystick: usize, button: u8, pressed: bool) {
        if button >= BUTTONS_PER_JOYSTICK {
            return;
        }
        if let Some(buttons) = self.buttons.get(joystick) {
            if pressed {
                buttons.fetch_or(1 << button, Ordering::Relaxed);
            } else {
                buttons.fetch_and(!(1 << button), Ordering::Relaxed);
            }
        }
    }

    /// Last stored axis position
    pub fn axis(&self, joystick: usize, axis: Axis) -> i16 {
        self.axes
            .get(joystick)
            .map_or(0, |axes| axes[axis as usize].load(Ordering::Relaxed))
    }

    /// Held buttons as a bitmask (bit n = button n)
    pub fn buttons(&self, joystick: usize) -> u8 {
        self.buttons
            .get(joystick)
            .map_or(0, |b| b.load(Ordering::Relaxed))
    }

    /// Read a joystick port. Returns `None` for ports the latch does not serve.
    pub fn port_in(&self, port: u8) -> Option<u8> {
        let value = match port {
            0 => !(self.buttons(0) | (self.buttons(1) << 4)),
            1 => axis_byte(self.axis(0, Axis::X)),
            2 => axis_byte(self.axis(0, Axis::Y).saturating_neg()),
            3 => axis_byte(self.axis(1, Axis::X)),
            4 => axis_byte(self.axis(1, Axis::Y).saturating_neg()),
            _ => return None,
        };
        Some(value)
    }
}

/// Scale a 16-bit position to the signed byte the board reports
#[inline]
fn axis_byte(value: i16) -> u8 {
    (value / 256) as i8 as u8
}
