#![forbid(unsafe_code)]

//! Subscription registry keyed by consumer identity.
//!
//! Consumers (the keyboard service, each layout synchronizer) never talk to
//! the bus directly. They register with a [`SubscriptionRegistry`], which
//! holds one token set per [`ConsumerId`] and only a [`Weak`] reference to
//! the handler, so a consumer's lifetime is never extended by the bus.
//!
//! # How it works
//!
//! 1. `register(id, kinds, handler)` cancels any tokens already held for
//!    `id`, then subscribes one callback per kind
//! 2. Each callback upgrades the weak handler; a dropped handler is skipped
//! 3. `unregister(id)` cancels and forgets every token for `id`
//! 4. Dropping the registry cancels everything it still holds

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use kbshift_core::{BusEvent, EventKind};

use crate::bus::{BusCallback, EventBus, SubscriptionToken};

/// Stable identity of a bus consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

static NEXT_CONSUMER: AtomicU64 = AtomicU64::new(1);

impl ConsumerId {
    /// Allocate a process-unique identity.
    pub fn next() -> Self {
        Self(NEXT_CONSUMER.fetch_add(1, Ordering::Relaxed))
    }

    /// Use an identity chosen by the host.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identity value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// Something that reacts to bus events.
pub trait BusHandler: Send + Sync {
    /// Handle one delivered event.
    fn handle_event(&self, event: &BusEvent);
}

/// Registers consumers against an [`EventBus`], one token set per identity.
pub struct SubscriptionRegistry {
    bus: Arc<dyn EventBus>,
    tokens: Mutex<HashMap<ConsumerId, Vec<SubscriptionToken>>>,
}

impl SubscriptionRegistry {
    /// Create a registry over `bus`.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self {
            bus,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying bus.
    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    /// Subscribe `handler` to `kinds` under `consumer`.
    ///
    /// Re-registering the same consumer first cancels its previous tokens,
    /// so a consumer is never subscribed twice.
    pub fn register<H>(&self, consumer: ConsumerId, kinds: &[EventKind], handler: Weak<H>)
    where
        H: BusHandler + 'static,
    {
        let mut tokens = self.lock();
        if let Some(previous) = tokens.remove(&consumer) {
            tracing::debug!(%consumer, count = previous.len(), "Replacing keyboard subscriptions");
            self.cancel(previous);
        }

        let issued = kinds
            .iter()
            .map(|&kind| {
                let handler = handler.clone();
                let callback: BusCallback = Arc::new(move |event: &BusEvent| {
                    if let Some(handler) = handler.upgrade() {
                        handler.handle_event(event);
                    }
                });
                self.bus.subscribe(kind, callback)
            })
            .collect::<Vec<_>>();

        tracing::debug!(%consumer, count = issued.len(), "Registered keyboard subscriptions");
        tokens.insert(consumer, issued);
    }

    /// Cancel and forget every token held for `consumer`.
    ///
    /// Returns the number of subscriptions cancelled; `0` if the consumer was
    /// not registered.
    pub fn unregister(&self, consumer: ConsumerId) -> usize {
        let Some(previous) = self.lock().remove(&consumer) else {
            return 0;
        };
        let count = previous.len();
        self.cancel(previous);
        tracing::debug!(%consumer, count, "Unregistered keyboard subscriptions");
        count
    }

    /// Returns `true` if `consumer` currently holds tokens.
    pub fn is_registered(&self, consumer: ConsumerId) -> bool {
        self.lock().contains_key(&consumer)
    }

    /// Number of registered consumers.
    pub fn consumer_count(&self) -> usize {
        self.lock().len()
    }

    fn cancel(&self, tokens: Vec<SubscriptionToken>) {
        for token in tokens {
            self.bus.unsubscribe(token);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConsumerId, Vec<SubscriptionToken>>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        let all: Vec<_> = self.lock().drain().flat_map(|(_, tokens)| tokens).collect();
        self.cancel(all);
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("consumers", &self.consumer_count())
            .finish_non_exhaustive()
    }
}
