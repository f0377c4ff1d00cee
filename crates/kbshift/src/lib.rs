#![forbid(unsafe_code)]

//! kbshift public facade crate.
//!
//! Re-exports the common types from the internal crates, offers a prelude,
//! and provides [`KeyboardContext`]: one explicitly scoped owner of the bus
//! wiring, the keyboard state, and the animator that every consumer's
//! [`LayoutSynchronizer`] shares.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kbshift::prelude::*;
//!
//! let ctx = KeyboardContext::new(FixedWindow::from_size(400.0, 800.0), KeyboardPolicy::default());
//!
//! let scene = Arc::new(SceneTree::new(Rect::from_size(400.0, 800.0)));
//! let field = scene.add_child(&scene.root(), Rect::new(20.0, 450.0, 200.0, 300.0));
//! scene.focus(&field);
//!
//! let bottom = SharedConstraint::new(20.0);
//! let sync = ctx.synchronizer(Arc::clone(&scene));
//! sync.set_managed_constraints(vec![ManagedConstraint::bottom(bottom.clone())])?;
//! sync.set_handles_keyboard(true)?;
//!
//! ctx.post_transition(
//!     TransitionKind::WillShow,
//!     RawPayload::new(Rect::new(0.0, 800.0, 400.0, 300.0), Rect::new(0.0, 500.0, 400.0, 300.0), 0.25, 7),
//! );
//! assert!(ctx.is_keyboard_visible());
//! assert_eq!(bottom.constant(), 310.0);
//! # Ok::<(), kbshift::Error>(())
//! ```

use std::sync::Arc;

// --- Core re-exports -------------------------------------------------------

pub use kbshift_core::{
    AnimationOptions, BusEvent, CenterShift, EventKind, FixedWindow, KeyboardChange, KeyboardPolicy,
    KeyboardState, KeyboardStateHandle, KeyboardStateTracker, LayoutPolicy, PayloadError,
    PolicyConfigError, RawPayload, Rect, RootWindow, RotationPolicy, TransitionEvent, TransitionKind,
};

// --- Runtime re-exports ----------------------------------------------------

pub use kbshift_runtime::{
    AnimationOutcome, AnimationSpec, ConsumerId, EventBus, ImmediateAnimator, KeyboardService, LocalBus,
    QueuedAnimator, SubscriptionRegistry, TransitionAnimator, TransitionHandle,
};

// --- Layout re-exports -----------------------------------------------------

pub use kbshift_layout::{
    ConstraintAnchor, KeyboardError, LayoutConstraint, LayoutSynchronizer, ManagedConstraint,
    OriginalValueStore, SceneTree, SceneView, SharedConstraint, TargetId, ViewTree,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for kbshift hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A consumer's keyboard handling is misconfigured.
    #[error(transparent)]
    Keyboard(#[from] KeyboardError),
    /// The keyboard policy could not be loaded.
    #[error(transparent)]
    Policy(#[from] PolicyConfigError),
}

/// Standard result type for kbshift APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Context ---------------------------------------------------------------

/// Shared keyboard wiring for one root window.
///
/// Created once at startup; dropping it stops the keyboard service. Every
/// synchronizer created through it reads the same keyboard state.
pub struct KeyboardContext<W: RootWindow + 'static> {
    policy: KeyboardPolicy,
    registry: Arc<SubscriptionRegistry>,
    service: Arc<KeyboardService<W>>,
    animator: Arc<dyn TransitionAnimator>,
}

impl<W: RootWindow + 'static> KeyboardContext<W> {
    /// Wire a [`LocalBus`] and an [`ImmediateAnimator`].
    pub fn new(window: W, policy: KeyboardPolicy) -> Self {
        Self::with_parts(window, policy, Arc::new(LocalBus::new()), Arc::new(ImmediateAnimator))
    }

    /// Wire a host-provided bus and animator.
    pub fn with_parts(
        window: W,
        policy: KeyboardPolicy,
        bus: Arc<dyn EventBus>,
        animator: Arc<dyn TransitionAnimator>,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(bus));
        let service = KeyboardService::start(window, &policy, Arc::clone(&registry));
        tracing::debug!(?policy, "Keyboard context ready");
        Self {
            policy,
            registry,
            service,
            animator,
        }
    }

    /// Create a synchronizer for one consumer's view tree.
    pub fn synchronizer<T: ViewTree + 'static>(&self, tree: Arc<T>) -> Arc<LayoutSynchronizer<T>> {
        LayoutSynchronizer::with_policy(
            tree,
            self.service.state(),
            Arc::clone(&self.registry),
            Arc::clone(&self.animator),
            &self.policy.layout,
        )
    }

    /// Forward a raw platform payload to the bus.
    pub fn post_transition(&self, kind: TransitionKind, payload: RawPayload) {
        self.registry.bus().post(BusEvent::Keyboard { kind, payload });
    }

    /// Forward an orientation signal to the bus.
    pub fn post_orientation_change(&self) {
        self.registry.bus().post(BusEvent::OrientationWillChange);
    }

    /// Returns `true` if the keyboard is currently visible.
    pub fn is_keyboard_visible(&self) -> bool {
        self.service.is_keyboard_visible()
    }

    /// The keyboard's frame in window coordinates, or [`Rect::ZERO`] when hidden.
    pub fn current_keyboard_frame(&self) -> Rect {
        self.service.current_keyboard_frame()
    }

    /// The keyboard service.
    pub fn service(&self) -> &Arc<KeyboardService<W>> {
        &self.service
    }

    /// The policy the context was created with.
    pub fn policy(&self) -> &KeyboardPolicy {
        &self.policy
    }
}

impl<W: RootWindow + 'static> Drop for KeyboardContext<W> {
    fn drop(&mut self) {
        self.service.shutdown();
    }
}

impl<W: RootWindow + 'static> std::fmt::Debug for KeyboardContext<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardContext")
            .field("policy", &self.policy)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Error, FixedWindow, KeyboardContext, KeyboardPolicy, LayoutConstraint, LayoutSynchronizer,
        ManagedConstraint, RawPayload, Rect, Result, SceneTree, SharedConstraint, TransitionKind,
        ViewTree,
    };

    pub use crate::{core, layout, runtime};
}

pub use kbshift_core as core;
pub use kbshift_layout as layout;
pub use kbshift_runtime as runtime;
