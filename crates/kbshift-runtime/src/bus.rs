#![forbid(unsafe_code)]

//! Event bus seam.
//!
//! The host's notification bus is an external collaborator. [`EventBus`] is
//! the narrow surface the runtime needs from it: subscribe a callback to one
//! [`EventKind`], cancel that subscription by token, and post an event.
//!
//! [`LocalBus`] is an in-process implementation for hosts without a bus of
//! their own, and for tests.
//!
//! # Invariants
//!
//! 1. Callbacks are invoked outside the bus lock, so a callback may post,
//!    subscribe or unsubscribe re-entrantly.
//! 2. Once [`EventBus::unsubscribe`] returns, the callback is never invoked
//!    again, even by a dispatch that was already in progress.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kbshift_core::{BusEvent, EventKind};

/// Opaque handle for one bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Wrap a raw token value issued by a bus implementation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// Callback invoked for every event of the subscribed kind.
pub type BusCallback = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// The slice of a notification bus the runtime depends on.
pub trait EventBus: Send + Sync {
    /// Subscribe `callback` to events of `kind`.
    fn subscribe(&self, kind: EventKind, callback: BusCallback) -> SubscriptionToken;

    /// Cancel a subscription. Returns `false` if the token was unknown.
    fn unsubscribe(&self, token: SubscriptionToken) -> bool;

    /// Deliver `event` to every subscriber of its kind.
    fn post(&self, event: BusEvent);
}

struct Entry {
    token: SubscriptionToken,
    kind: EventKind,
    live: Arc<AtomicBool>,
    callback: BusCallback,
}

/// Synchronous in-process bus.
///
/// `post` dispatches on the calling thread, in subscription order.
#[derive(Default)]
pub struct LocalBus {
    next_token: AtomicU64,
    entries: Mutex<Vec<Entry>>,
}

impl LocalBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of live subscriptions for one kind.
    pub fn subscriber_count_for(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for LocalBus {
    fn subscribe(&self, kind: EventKind, callback: BusCallback) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Entry {
            token,
            kind,
            live: Arc::new(AtomicBool::new(true)),
            callback,
        });
        token
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| e.token == token) {
            Some(index) => {
                let entry = entries.remove(index);
                entry.live.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    fn post(&self, event: BusEvent) {
        let kind = event.kind();
        let targets: Vec<(Arc<AtomicBool>, BusCallback)> = self
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (Arc::clone(&e.live), Arc::clone(&e.callback)))
            .collect();

        for (live, callback) in targets {
            if live.load(Ordering::Acquire) {
                callback(&event);
            }
        }
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
