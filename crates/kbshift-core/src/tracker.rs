#![forbid(unsafe_code)]

//! Keyboard state tracking from raw transition payloads.
//!
//! [`KeyboardStateTracker`] is the single writer of a [`KeyboardState`]. Each
//! raw payload is decoded into a [`TransitionEvent`], measured against the
//! root window, stored, and only then turned into a [`KeyboardChange`] for
//! publication.
//!
//! # Invariants
//!
//! 1. `is_visible == true` iff the final frame, converted into window space,
//!    intersects the window bounds with positive height.
//! 2. `current_frame` is that intersection while visible, [`Rect::ZERO`]
//!    otherwise.
//! 3. The returned change carries the state *after* the store, and its
//!    event's `is_presenting` equals the new visibility.
//!
//! # Failure Modes
//!
//! - Malformed payload: dropped, logged at debug, state untouched.
//! - Rotation duplicate: state stored, change suppressed.

use crate::event::KeyboardChange;
use crate::geometry::Rect;
use crate::policy::RotationPolicy;
use crate::rotation::RotationGuard;
use crate::state::{KeyboardState, KeyboardStateHandle};
use crate::transition::{RawPayload, TransitionEvent, TransitionKind};
use crate::window::RootWindow;

/// Maintains keyboard visibility and frame for one root window.
#[derive(Debug)]
pub struct KeyboardStateTracker<W> {
    window: W,
    state: KeyboardStateHandle,
    rotation: RotationGuard,
    last_published: Option<KeyboardState>,
    applied: u64,
}

impl<W: RootWindow> KeyboardStateTracker<W> {
    /// Create a tracker for `window` with the default rotation policy.
    pub fn new(window: W) -> Self {
        Self::with_rotation_policy(window, RotationPolicy::default())
    }

    /// Create a tracker with an explicit rotation policy.
    pub fn with_rotation_policy(window: W, rotation: RotationPolicy) -> Self {
        Self {
            window,
            state: KeyboardStateHandle::new(),
            rotation: RotationGuard::new(rotation),
            last_published: None,
            applied: 0,
        }
    }

    /// A reader handle onto this tracker's state.
    pub fn state(&self) -> KeyboardStateHandle {
        self.state.clone()
    }

    /// The tracked window.
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Mutable access to the tracked window, e.g. to follow a resize.
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Number of transitions applied so far (suppressed ones included).
    pub fn transitions_applied(&self) -> u64 {
        self.applied
    }

    /// Decode a raw payload. Returns `None` (and logs why) if it is malformed.
    pub fn on_raw_transition(&self, kind: TransitionKind, payload: &RawPayload) -> Option<TransitionEvent> {
        match TransitionEvent::try_from_payload(kind, payload) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(?kind, error = %err, "Dropping malformed keyboard payload");
                None
            }
        }
    }

    /// Apply a decoded transition to the keyboard state.
    ///
    /// Returns the normalized change to publish, or `None` if the transition
    /// is a rotation duplicate of the last published change.
    pub fn apply_transition(&mut self, event: TransitionEvent) -> Option<KeyboardChange> {
        let for_rotation = self.rotation.consume();

        let converted = self.window.convert_from_screen(event.final_rect());
        let next = match converted.intersection_opt(&self.window.bounds()) {
            Some(visible) if visible.height > 0.0 => KeyboardState::visible(visible),
            _ => KeyboardState::HIDDEN,
        };
        self.state.store(next);
        self.applied += 1;

        if for_rotation && self.last_published == Some(next) {
            tracing::trace!(
                remaining = self.rotation.remaining(),
                "Suppressing duplicate keyboard transition during rotation"
            );
            return None;
        }

        tracing::debug!(
            visible = next.is_visible(),
            height = next.current_frame().height,
            for_rotation,
            "Applied keyboard transition"
        );
        self.last_published = Some(next);
        let event = event
            .with_presenting(next.is_visible())
            .with_rotation(for_rotation);
        Some(KeyboardChange { event, state: next })
    }

    /// Decode and apply in one step.
    pub fn handle_payload(&mut self, kind: TransitionKind, payload: &RawPayload) -> Option<KeyboardChange> {
        let event = self.on_raw_transition(kind, payload)?;
        self.apply_transition(event)
    }

    /// Arm (or reset) the rotation guard for an orientation signal.
    pub fn on_orientation_change(&mut self) {
        self.rotation.on_orientation_change(self.state.is_keyboard_visible());
    }

    /// Returns `true` if the keyboard is currently visible.
    pub fn is_keyboard_visible(&self) -> bool {
        self.state.is_keyboard_visible()
    }

    /// The keyboard's frame in window coordinates, or [`Rect::ZERO`] when hidden.
    pub fn current_keyboard_frame(&self) -> Rect {
        self.state.current_keyboard_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::FixedWindow;

    const SHOWN: Rect = Rect::new(0.0, 500.0, 400.0, 300.0);
    const PARKED: Rect = Rect::new(0.0, 800.0, 400.0, 300.0);

    fn tracker() -> KeyboardStateTracker<FixedWindow> {
        KeyboardStateTracker::new(FixedWindow::from_size(400.0, 800.0))
    }

    fn payload(from: Rect, to: Rect) -> RawPayload {
        RawPayload::new(from, to, 0.25, 7)
    }

    #[test]
    fn show_then_hide() {
        let mut tracker = tracker();
        let change = tracker
            .handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN))
            .unwrap();
        assert!(change.state.is_visible());
        assert_eq!(change.state.current_frame(), SHOWN);
        assert!(change.event.is_presenting());
        assert!(tracker.is_keyboard_visible());

        let change = tracker
            .handle_payload(TransitionKind::WillHide, &payload(SHOWN, PARKED))
            .unwrap();
        assert!(!change.state.is_visible());
        assert_eq!(change.state.current_frame(), Rect::ZERO);
        assert!(!change.event.is_presenting());
        assert_eq!(tracker.current_keyboard_frame(), Rect::ZERO);
    }

    #[test]
    fn frame_is_clipped_to_window() {
        let mut tracker = tracker();
        let tall = Rect::new(0.0, 600.0, 400.0, 400.0);
        let change = tracker
            .handle_payload(TransitionKind::WillChangeFrame, &payload(PARKED, tall))
            .unwrap();
        assert_eq!(change.state.current_frame(), Rect::new(0.0, 600.0, 400.0, 200.0));
    }

    #[test]
    fn show_kind_with_offscreen_frame_is_not_presenting() {
        let mut tracker = tracker();
        let change = tracker
            .handle_payload(TransitionKind::WillShow, &payload(PARKED, PARKED))
            .unwrap();
        assert!(!change.event.is_presenting());
        assert!(!change.state.is_visible());
    }

    #[test]
    fn malformed_payload_leaves_state_untouched() {
        let mut tracker = tracker();
        tracker.handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN));
        let mut broken = payload(SHOWN, PARKED);
        broken.curve = None;
        assert!(tracker.handle_payload(TransitionKind::WillHide, &broken).is_none());
        assert!(tracker.is_keyboard_visible());
        assert_eq!(tracker.transitions_applied(), 1);
    }

    #[test]
    fn rotation_duplicates_are_suppressed() {
        let mut tracker = tracker();
        tracker.handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN));

        tracker.on_orientation_change();
        // Same geometry reported again while rotating: dropped.
        assert!(tracker
            .handle_payload(TransitionKind::WillShow, &payload(SHOWN, SHOWN))
            .is_none());

        // New geometry while rotating: published and tagged.
        let landscape = Rect::new(0.0, 550.0, 400.0, 250.0);
        let change = tracker
            .handle_payload(TransitionKind::WillChangeFrame, &payload(SHOWN, landscape))
            .unwrap();
        assert!(change.event.for_rotation());
        assert_eq!(tracker.current_keyboard_frame(), landscape);
    }

    #[test]
    fn rotation_guard_expires_after_budget() {
        let mut tracker = tracker();
        tracker.handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN));
        tracker.on_orientation_change();
        for _ in 0..4 {
            assert!(tracker
                .handle_payload(TransitionKind::WillShow, &payload(SHOWN, SHOWN))
                .is_none());
        }
        let change = tracker
            .handle_payload(TransitionKind::WillShow, &payload(SHOWN, SHOWN))
            .unwrap();
        assert!(!change.event.for_rotation());
    }

    #[test]
    fn rotation_with_hidden_keyboard_does_not_arm() {
        let mut tracker = tracker();
        tracker.on_orientation_change();
        let change = tracker
            .handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN))
            .unwrap();
        assert!(!change.event.for_rotation());
    }

    #[test]
    fn disabled_rotation_policy_publishes_everything() {
        let mut tracker = KeyboardStateTracker::with_rotation_policy(
            FixedWindow::from_size(400.0, 800.0),
            RotationPolicy {
                enabled: false,
                duplicate_budget: 4,
            },
        );
        tracker.handle_payload(TransitionKind::WillShow, &payload(PARKED, SHOWN));
        tracker.on_orientation_change();
        assert!(tracker
            .handle_payload(TransitionKind::WillShow, &payload(SHOWN, SHOWN))
            .is_some());
    }
}
