#![forbid(unsafe_code)]

//! Event vocabulary shared by the bus, the tracker and the synchronizers.
//!
//! Raw platform signals come in as [`BusEvent::Keyboard`] and
//! [`BusEvent::OrientationWillChange`]; the tracker answers each applied
//! transition with exactly one normalized [`BusEvent::KeyboardDidChange`].

use crate::state::KeyboardState;
use crate::transition::{RawPayload, TransitionEvent, TransitionKind};

/// Kinds a consumer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Raw "keyboard will show" payloads.
    KeyboardWillShow,
    /// Raw "keyboard will hide" payloads.
    KeyboardWillHide,
    /// Raw "keyboard will change frame" payloads.
    KeyboardWillChangeFrame,
    /// Interface orientation is about to change.
    OrientationWillChange,
    /// Normalized change published after keyboard state was updated.
    KeyboardDidChange,
}

impl EventKind {
    /// Raw kinds the tracker listens to.
    pub const TRACKER_INPUTS: [EventKind; 4] = [
        EventKind::KeyboardWillShow,
        EventKind::KeyboardWillHide,
        EventKind::KeyboardWillChangeFrame,
        EventKind::OrientationWillChange,
    ];
}

impl From<TransitionKind> for EventKind {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::WillShow => EventKind::KeyboardWillShow,
            TransitionKind::WillHide => EventKind::KeyboardWillHide,
            TransitionKind::WillChangeFrame => EventKind::KeyboardWillChangeFrame,
        }
    }
}

/// A normalized keyboard change.
///
/// `state` is the tracker's state *after* applying `event`, so handlers
/// never observe stale state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardChange {
    /// The transition, with `is_presenting` reconciled against the window.
    pub event: TransitionEvent,
    /// Keyboard state after the transition was applied.
    pub state: KeyboardState,
}

/// An event travelling over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// Raw keyboard payload from the platform.
    Keyboard {
        /// Which platform signal fired.
        kind: TransitionKind,
        /// The undecoded payload.
        payload: RawPayload,
    },
    /// The interface is about to rotate.
    OrientationWillChange,
    /// A normalized change published by the tracker.
    KeyboardDidChange(KeyboardChange),
}

impl BusEvent {
    /// The subscription kind this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::Keyboard { kind, .. } => EventKind::from(*kind),
            BusEvent::OrientationWillChange => EventKind::OrientationWillChange,
            BusEvent::KeyboardDidChange(_) => EventKind::KeyboardDidChange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_events_map_to_their_kind() {
        let event = BusEvent::Keyboard {
            kind: TransitionKind::WillHide,
            payload: RawPayload::default(),
        };
        assert_eq!(event.kind(), EventKind::KeyboardWillHide);
        assert_eq!(
            BusEvent::OrientationWillChange.kind(),
            EventKind::OrientationWillChange
        );
    }

    #[test]
    fn tracker_inputs_exclude_normalized_kind() {
        assert!(!EventKind::TRACKER_INPUTS.contains(&EventKind::KeyboardDidChange));
    }
}
