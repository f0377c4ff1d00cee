#![forbid(unsafe_code)]

//! Suppression of duplicate keyboard transitions during rotation.
//!
//! Some platform revisions report the keyboard several times while the
//! interface rotates (observed budgets are 2 and 4). An orientation signal
//! arms a decrementing counter; every transition that arrives while the
//! counter is positive is tagged as rotation-caused, and the tracker drops
//! the ones that repeat the last published geometry.
//!
//! The guard is a compatibility shim. Disabling it leaves every transition
//! untagged and published.

use crate::policy::RotationPolicy;

/// Decrementing counter armed by orientation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationGuard {
    enabled: bool,
    budget: u8,
    remaining: u8,
}

impl RotationGuard {
    /// Create a guard from its policy.
    pub fn new(policy: RotationPolicy) -> Self {
        Self {
            enabled: policy.enabled,
            budget: policy.duplicate_budget,
            remaining: 0,
        }
    }

    /// A guard that never tags or suppresses anything.
    pub fn disabled() -> Self {
        Self::new(RotationPolicy {
            enabled: false,
            ..RotationPolicy::default()
        })
    }

    /// Handle an orientation signal.
    ///
    /// Rotating with the keyboard hidden produces no keyboard transitions,
    /// so the counter is reset instead of armed.
    pub fn on_orientation_change(&mut self, keyboard_visible: bool) {
        if !self.enabled || !keyboard_visible {
            self.remaining = 0;
            return;
        }
        self.remaining = self.budget;
    }

    /// Consume one slot for an incoming transition.
    ///
    /// Returns `true` if the transition arrived while rotating.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Returns `true` while transitions are being tagged.
    #[inline]
    pub fn is_rotating(&self) -> bool {
        self.remaining > 0
    }

    /// Transitions still expected from the current rotation.
    #[inline]
    pub fn remaining(&self) -> u8 {
        self.remaining
    }
}

impl Default for RotationGuard {
    fn default() -> Self {
        Self::new(RotationPolicy::default())
    }
}
