#![forbid(unsafe_code)]

//! Current keyboard visibility and frame.
//!
//! There is exactly one [`KeyboardState`] per
//! [`KeyboardStateTracker`](crate::tracker::KeyboardStateTracker). The
//! tracker is its only writer; every [`KeyboardStateHandle`] clone is a
//! reader.
//!
//! Reads are wait-free snapshots through `arc-swap`: a reader never observes
//! a visible flag from one transition paired with the frame of another.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::geometry::Rect;

/// Keyboard visibility and on-screen frame.
///
/// `current_frame` is [`Rect::ZERO`] iff `is_visible` is false.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyboardState {
    is_visible: bool,
    current_frame: Rect,
}

impl KeyboardState {
    /// The hidden state.
    pub const HIDDEN: KeyboardState = KeyboardState {
        is_visible: false,
        current_frame: Rect::ZERO,
    };

    /// A visible keyboard occupying `frame` (window coordinates).
    pub(crate) fn visible(frame: Rect) -> Self {
        Self {
            is_visible: true,
            current_frame: frame,
        }
    }

    /// Returns `true` if the keyboard is currently visible.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// The keyboard's frame in window coordinates, or [`Rect::ZERO`] when hidden.
    #[inline]
    pub fn current_frame(&self) -> Rect {
        self.current_frame
    }
}

impl fmt::Display for KeyboardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Keyboard: {{visible: {}, current frame: {}}}",
            self.is_visible, self.current_frame
        )
    }
}

/// Shared, read-mostly handle to a tracker's [`KeyboardState`].
#[derive(Clone)]
pub struct KeyboardStateHandle {
    inner: Arc<ArcSwap<KeyboardState>>,
}

impl KeyboardStateHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(KeyboardState::HIDDEN)),
        }
    }

    /// Consistent snapshot of the current state.
    #[inline]
    pub fn snapshot(&self) -> KeyboardState {
        **self.inner.load()
    }

    /// Returns `true` if the keyboard is currently visible.
    #[inline]
    pub fn is_keyboard_visible(&self) -> bool {
        self.snapshot().is_visible()
    }

    /// The keyboard's frame in window coordinates, or [`Rect::ZERO`] when hidden.
    #[inline]
    pub fn current_keyboard_frame(&self) -> Rect {
        self.snapshot().current_frame()
    }

    pub(crate) fn store(&self, state: KeyboardState) {
        self.inner.store(Arc::new(state));
    }
}

impl fmt::Debug for KeyboardStateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyboardStateHandle")
            .field(&self.snapshot())
            .finish()
    }
}
