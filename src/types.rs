// src/types.rs

//! Value types shared by the facade and every backend: sizes, mouse buttons,
//! window identities and the `Event` enum produced by polling.

use serde::{Deserialize, Serialize};

/// Width/height pair in points (Cocoa) or pixels (X11).
///
/// Non-negativity is expected but not checked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Dimensions as X11 wants them: truncated and clamped into `1..=u16::MAX`.
    ///
    /// The server rejects a zero width or height with BadValue.
    pub fn to_u16_pair(self) -> (u16, u16) {
        (clamp_to_u16(self.width), clamp_to_u16(self.height))
    }
}

impl From<(f64, f64)> for Size {
    fn from((width, height): (f64, f64)) -> Self {
        Size::new(width, height)
    }
}

fn clamp_to_u16(v: f64) -> u16 {
    if v.is_nan() || v < 1.0 {
        1
    } else if v >= u16::MAX as f64 {
        u16::MAX
    } else {
        v as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Maps a core X11 button number. Wheel and extra buttons have no mapping.
    pub fn from_x11_button(button: u8) -> Option<Self> {
        match button {
            1 => Some(MouseButton::Left),
            2 => Some(MouseButton::Middle),
            3 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// Opaque identity of a native window. Two handles name the same window iff
/// their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Input and lifecycle events returned by `Platform::poll_event`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The application was asked to terminate (e.g. the Quit menu item).
    Quit,
    KeyDown {
        key_code: u16,
    },
    KeyUp {
        key_code: u16,
    },
    /// Pointer motion with no button held.
    MouseMoved {
        delta: (f64, f64),
        absolute: (f64, f64),
        window: Option<WindowId>,
    },
    MouseUp(MouseButton),
    MouseDown(MouseButton),
    /// Pointer motion while `MouseButton` is held.
    MouseDragged(MouseButton),
    WindowClosed(WindowId),
}

impl Event {
    /// True for events after which a single-window application should exit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Quit | Event::WindowClosed(_))
    }
}
