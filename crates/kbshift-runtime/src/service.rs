#![forbid(unsafe_code)]

//! Bus-driven keyboard service.
//!
//! [`KeyboardService`] owns the [`KeyboardStateTracker`] for one root window,
//! subscribes it to the raw platform signals, and republishes every applied
//! transition as [`BusEvent::KeyboardDidChange`].
//!
//! # Invariants
//!
//! 1. The tracker lock is released before the normalized change is posted,
//!    so handlers may query the service re-entrantly.
//! 2. State is stored before the change is posted; a handler reading
//!    [`KeyboardService::state`] sees the new state.
//! 3. Dropping the service (or calling [`shutdown`](KeyboardService::shutdown))
//!    removes its subscriptions.

use std::sync::{Arc, Mutex};

use kbshift_core::{
    BusEvent, EventKind, KeyboardPolicy, KeyboardState, KeyboardStateHandle, KeyboardStateTracker, Rect,
    RootWindow,
};

use crate::subscription::{BusHandler, ConsumerId, SubscriptionRegistry};

/// Keyboard state tracker wired to an event bus.
pub struct KeyboardService<W> {
    consumer: ConsumerId,
    tracker: Mutex<KeyboardStateTracker<W>>,
    state: KeyboardStateHandle,
    registry: Arc<SubscriptionRegistry>,
}

impl<W: RootWindow + 'static> KeyboardService<W> {
    /// Create a service for `window` and subscribe it to the tracker inputs.
    pub fn start(window: W, policy: &KeyboardPolicy, registry: Arc<SubscriptionRegistry>) -> Arc<Self> {
        let tracker = KeyboardStateTracker::with_rotation_policy(window, policy.rotation);
        let service = Arc::new(Self {
            consumer: ConsumerId::next(),
            state: tracker.state(),
            tracker: Mutex::new(tracker),
            registry,
        });
        service
            .registry
            .register(service.consumer, &EventKind::TRACKER_INPUTS, Arc::downgrade(&service));
        tracing::debug!(consumer = %service.consumer, "Keyboard service started");
        service
    }

    /// Identity under which the service is subscribed.
    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer
    }

    /// A lock-free reader handle onto the keyboard state.
    pub fn state(&self) -> KeyboardStateHandle {
        self.state.clone()
    }

    /// Current keyboard state snapshot.
    pub fn snapshot(&self) -> KeyboardState {
        self.state.snapshot()
    }

    /// Returns `true` if the keyboard is currently visible.
    pub fn is_keyboard_visible(&self) -> bool {
        self.state.is_keyboard_visible()
    }

    /// The keyboard's frame in window coordinates, or [`Rect::ZERO`] when hidden.
    pub fn current_keyboard_frame(&self) -> Rect {
        self.state.current_keyboard_frame()
    }

    /// Mutate the tracked window, e.g. after the host resized it.
    pub fn update_window(&self, f: impl FnOnce(&mut W)) {
        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        f(tracker.window_mut());
    }

    /// Stop listening to the bus. Idempotent.
    pub fn shutdown(&self) {
        if self.registry.unregister(self.consumer) > 0 {
            tracing::debug!(consumer = %self.consumer, "Keyboard service stopped");
        }
    }
}

impl<W: RootWindow + 'static> BusHandler for KeyboardService<W> {
    fn handle_event(&self, event: &BusEvent) {
        let change = {
            let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
            match event {
                BusEvent::Keyboard { kind, payload } => tracker.handle_payload(*kind, payload),
                BusEvent::OrientationWillChange => {
                    tracker.on_orientation_change();
                    None
                }
                BusEvent::KeyboardDidChange(_) => None,
            }
        };

        if let Some(change) = change {
            self.registry.bus().post(BusEvent::KeyboardDidChange(change));
        }
    }
}

impl<W> Drop for KeyboardService<W> {
    fn drop(&mut self) {
        self.registry.unregister(self.consumer);
    }
}

impl<W> std::fmt::Debug for KeyboardService<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardService")
            .field("consumer", &self.consumer)
            .field("state", &self.state.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EventBus, LocalBus};
    use kbshift_core::{FixedWindow, RawPayload, TransitionKind};

    const SHOWN: Rect = Rect::new(0.0, 500.0, 400.0, 300.0);
    const PARKED: Rect = Rect::new(0.0, 800.0, 400.0, 300.0);

    fn setup() -> (Arc<LocalBus>, Arc<KeyboardService<FixedWindow>>) {
        let bus = Arc::new(LocalBus::new());
        let registry = Arc::new(SubscriptionRegistry::new(bus.clone()));
        let service = KeyboardService::start(
            FixedWindow::from_size(400.0, 800.0),
            &KeyboardPolicy::default(),
            registry,
        );
        (bus, service)
    }

    fn show() -> BusEvent {
        BusEvent::Keyboard {
            kind: TransitionKind::WillShow,
            payload: RawPayload::new(PARKED, SHOWN, 0.25, 7),
        }
    }

    #[test]
    fn start_subscribes_tracker_inputs() {
        let (bus, _service) = setup();
        assert_eq!(bus.subscriber_count(), EventKind::TRACKER_INPUTS.len());
        assert_eq!(bus.subscriber_count_for(EventKind::KeyboardDidChange), 0);
    }

    #[test]
    fn raw_event_updates_state() {
        let (bus, service) = setup();
        bus.post(show());
        assert!(service.is_keyboard_visible());
        assert_eq!(service.current_keyboard_frame(), SHOWN);
    }

    #[test]
    fn shutdown_and_drop_unsubscribe() {
        let (bus, service) = setup();
        service.shutdown();
        service.shutdown();
        assert_eq!(bus.subscriber_count(), 0);
        bus.post(show());
        assert!(!service.is_keyboard_visible());

        let (bus, service) = setup();
        drop(service);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn window_resize_changes_visibility() {
        let (bus, service) = setup();
        service.update_window(|w| w.set_frame(Rect::from_size(400.0, 480.0)));
        bus.post(show());
        assert!(!service.is_keyboard_visible());
    }
}
