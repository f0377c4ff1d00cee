//! Property-based invariant tests for the keyboard state tracker.
//!
//! 1. `is_visible` iff the final frame meets the window with positive height
//! 2. The current frame is zero whenever the keyboard is hidden
//! 3. A published change always agrees with the stored state
//! 4. No panics on arbitrary payload sequences

use kbshift_core::{
    FixedWindow, KeyboardStateTracker, RawPayload, Rect, RootWindow, TransitionKind,
};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-200.0f64..1200.0, -200.0f64..1200.0, 0.0f64..600.0, 0.0f64..600.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn kind_strategy() -> impl Strategy<Value = TransitionKind> {
    prop_oneof![
        Just(TransitionKind::WillShow),
        Just(TransitionKind::WillHide),
        Just(TransitionKind::WillChangeFrame),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Transition(TransitionKind, RawPayload),
    Rotate,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (
            kind_strategy(),
            prop::option::weighted(0.95, rect_strategy()),
            prop::option::weighted(0.95, rect_strategy()),
            prop::option::weighted(0.95, 0.0f64..1.0),
            prop::option::weighted(0.95, 0u32..8),
        )
            .prop_map(|(kind, frame_begin, frame_end, duration, curve)| {
                Op::Transition(
                    kind,
                    RawPayload {
                        frame_begin,
                        frame_end,
                        duration,
                        curve,
                    },
                )
            }),
        1 => Just(Op::Rotate),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Visibility matches intersection height
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn visibility_matches_window_intersection(
        window_frame in (0.0f64..50.0, 0.0f64..50.0, 100.0f64..1000.0, 100.0f64..1000.0),
        final_rect in rect_strategy(),
    ) {
        let (x, y, w, h) = window_frame;
        let window = FixedWindow::new(Rect::new(x, y, w, h));
        let expected = window
            .convert_from_screen(final_rect)
            .intersection(&window.bounds());
        let mut tracker = KeyboardStateTracker::new(window);
        let payload = RawPayload::new(Rect::ZERO, final_rect, 0.25, 7);
        let change = tracker.handle_payload(TransitionKind::WillChangeFrame, &payload);

        let visible = tracker.is_keyboard_visible();
        prop_assert_eq!(visible, expected.height > 0.0);
        if visible {
            prop_assert_eq!(tracker.current_keyboard_frame(), expected);
        } else {
            prop_assert_eq!(tracker.current_keyboard_frame(), Rect::ZERO);
        }
        let change = change.expect("first transition is always published");
        prop_assert_eq!(change.event.is_presenting(), visible);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Hidden state always reports the zero frame
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn hidden_implies_zero_frame(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut tracker = KeyboardStateTracker::new(FixedWindow::from_size(400.0, 800.0));
        for op in &ops {
            match op {
                Op::Transition(kind, payload) => {
                    if let Some(change) = tracker.handle_payload(*kind, payload) {
                        prop_assert_eq!(change.state, tracker.state().snapshot());
                        prop_assert_eq!(change.event.is_presenting(), change.state.is_visible());
                    }
                }
                Op::Rotate => tracker.on_orientation_change(),
            }
            let state = tracker.state().snapshot();
            if !state.is_visible() {
                prop_assert_eq!(state.current_frame(), Rect::ZERO);
            } else {
                prop_assert!(state.current_frame().height > 0.0);
            }
        }
    }
}
