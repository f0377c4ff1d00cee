#![forbid(unsafe_code)]

//! Runtime: bus plumbing, subscriptions, and cancellable transitions.
//!
//! # Role in kbshift
//! `kbshift-runtime` connects the pure state machine in `kbshift-core` to a
//! host's notification bus and animation system.
//!
//! # Primary responsibilities
//! - **EventBus**: the narrow bus seam, plus the in-process [`LocalBus`].
//! - **SubscriptionRegistry**: one token set per consumer identity.
//! - **KeyboardService**: tracker subscribed to raw signals, republishing
//!   normalized changes.
//! - **Transitions**: [`TransitionAnimator`] seam, [`TransitionSlot`] for
//!   at-most-one in-flight transition, and awaitable [`TransitionHandle`]s.

pub mod animation;
pub mod bus;
pub mod cancellation;
pub mod service;
pub mod subscription;

pub use animation::{
    AnimationCompletion, AnimationOutcome, AnimationSpec, ImmediateAnimator, LayoutChanges,
    QueuedAnimator, TransitionAnimator, TransitionHandle, TransitionSlot, TransitionTicket,
};
pub use bus::{BusCallback, EventBus, LocalBus, SubscriptionToken};
pub use cancellation::{CancellationSource, CancellationToken};
pub use service::KeyboardService;
pub use subscription::{BusHandler, ConsumerId, SubscriptionRegistry};
