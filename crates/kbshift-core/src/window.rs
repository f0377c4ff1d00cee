#![forbid(unsafe_code)]

//! The root window the keyboard is measured against.

use crate::geometry::Rect;

/// Host window abstraction used by the tracker.
///
/// Implementations wrap the toolkit's key window: its bounds and the
/// conversion of a screen-space rectangle into window space.
pub trait RootWindow: Send {
    /// Window bounds in window coordinates.
    fn bounds(&self) -> Rect;

    /// Convert a rectangle from screen coordinates into window coordinates.
    fn convert_from_screen(&self, rect: Rect) -> Rect;
}

/// A window with a fixed frame on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWindow {
    frame: Rect,
}

impl FixedWindow {
    /// A window occupying `frame` in screen coordinates.
    pub fn new(frame: Rect) -> Self {
        Self { frame }
    }

    /// A full-screen window of the given size.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Rect::from_size(width, height))
    }

    /// Move or resize the window, e.g. after a rotation.
    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }
}

impl RootWindow for FixedWindow {
    fn bounds(&self) -> Rect {
        Rect::from_size(self.frame.width, self.frame.height)
    }

    fn convert_from_screen(&self, rect: Rect) -> Rect {
        rect.offset(-self.frame.x, -self.frame.y)
    }
}
