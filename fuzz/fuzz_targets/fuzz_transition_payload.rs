#![no_main]

use kbshift_core::{FixedWindow, KeyboardStateTracker, RawPayload, Rect, TransitionKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the signal; the rest is a JSON payload stream.
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let mut tracker = KeyboardStateTracker::new(FixedWindow::from_size(400.0, 800.0));

    let stream = serde_json::Deserializer::from_slice(rest).into_iter::<RawPayload>();
    for (index, payload) in stream.enumerate() {
        let Ok(payload) = payload else {
            break;
        };
        let signal = selector.wrapping_add(index as u8) % 4;
        let kind = match signal {
            0 => TransitionKind::WillShow,
            1 => TransitionKind::WillHide,
            2 => TransitionKind::WillChangeFrame,
            _ => {
                tracker.on_orientation_change();
                TransitionKind::WillChangeFrame
            }
        };

        if let Some(change) = tracker.handle_payload(kind, &payload) {
            // Published changes agree with the stored state.
            assert_eq!(change.state, tracker.state().snapshot());
            assert_eq!(change.event.is_presenting(), change.state.is_visible());
            assert!(change.event.duration().as_secs_f64() >= 0.0);
        }

        let state = tracker.state().snapshot();
        if state.is_visible() {
            let frame = state.current_frame();
            assert!(frame.height > 0.0, "visible keyboard with empty frame");
            assert!(frame.is_finite());
        } else {
            assert_eq!(state.current_frame(), Rect::ZERO, "hidden keyboard kept a frame");
        }
    }
});
