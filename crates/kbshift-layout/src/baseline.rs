#![forbid(unsafe_code)]

//! Baseline values of managed targets.
//!
//! # Invariants
//!
//! 1. A capture happens once per activation: a second [`capture`] without an
//!    intervening [`clear`] is refused.
//! 2. [`restore`] never invents a value; an absent baseline is an error.
//!
//! [`capture`]: OriginalValueStore::capture
//! [`clear`]: OriginalValueStore::clear
//! [`restore`]: OriginalValueStore::restore

use std::collections::HashMap;

use kbshift_runtime::ConsumerId;

use crate::error::{KeyboardError, Result};
use crate::target::TargetId;

/// Per-consumer map from target identifier to baseline value.
#[derive(Debug, Clone)]
pub struct OriginalValueStore {
    consumer: ConsumerId,
    values: HashMap<TargetId, f64>,
    captured: bool,
}

impl OriginalValueStore {
    /// Create an empty store for `consumer`.
    pub fn new(consumer: ConsumerId) -> Self {
        Self {
            consumer,
            values: HashMap::new(),
            captured: false,
        }
    }

    /// Record every target's current value.
    ///
    /// Returns the number of baselines recorded, or
    /// [`KeyboardError::CaptureInFlight`] if a capture is already held.
    pub fn capture(&mut self, targets: impl IntoIterator<Item = (TargetId, f64)>) -> Result<usize> {
        if self.captured {
            return Err(KeyboardError::CaptureInFlight {
                consumer: self.consumer,
            });
        }
        self.values.extend(targets);
        self.captured = true;
        tracing::trace!(consumer = %self.consumer, count = self.values.len(), "Captured baselines");
        Ok(self.values.len())
    }

    /// Overwrite the baselines of `targets` within the current capture.
    ///
    /// Used when the consumer's view structure changed while the keyboard
    /// was hidden. Targets not named keep their baseline.
    pub fn recapture(&mut self, targets: impl IntoIterator<Item = (TargetId, f64)>) {
        for (id, value) in targets {
            self.values.insert(id, value);
        }
    }

    /// The recorded baseline for `target`.
    pub fn restore(&self, target: &TargetId) -> Result<f64> {
        self.values
            .get(target)
            .copied()
            .ok_or_else(|| KeyboardError::MissingBaseline {
                target: target.clone(),
            })
    }

    /// Forget one baseline, returning it.
    pub fn remove(&mut self, target: &TargetId) -> Option<f64> {
        self.values.remove(target)
    }

    /// Discard every baseline so the next activation captures afresh.
    pub fn clear(&mut self) {
        self.values.clear();
        self.captured = false;
    }

    /// Returns `true` while a capture is held.
    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Number of recorded baselines.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no baseline is recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The consumer this store belongs to.
    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }
}
