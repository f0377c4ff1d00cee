#![forbid(unsafe_code)]

//! Layout: keyboard-avoiding synchronization of managed targets.
//!
//! # Role in kbshift
//! `kbshift-layout` is the consumer side. Each screen owns a
//! [`LayoutSynchronizer`] that listens for normalized keyboard changes and
//! moves its managed constraints and views so the focused input element
//! stays above the keyboard.
//!
//! # Primary responsibilities
//! - **ViewTree / LayoutConstraint**: the host toolkit seam.
//! - **OriginalValueStore**: baselines captured once per activation.
//! - **Overlap**: keyboard/element overlap and per-anchor shift rules.
//! - **Target sets**: constraint-based and frame-based adjustment plans.
//! - **LayoutSynchronizer**: the per-event algorithm, transition
//!   supersession, and focus release on hide.

pub mod baseline;
pub mod constraints;
pub mod error;
pub mod frames;
pub mod overlap;
pub mod scene;
pub mod synchronizer;
pub mod target;
pub mod tree;

pub use baseline::OriginalValueStore;
pub use constraints::{ConstantWrite, ConstraintTargets};
pub use error::KeyboardError;
pub use frames::{FrameTargets, OriginWrite};
pub use overlap::{constraint_delta, keyboard_overlap};
pub use scene::{SceneTree, SceneView, SharedConstraint};
pub use synchronizer::LayoutSynchronizer;
pub use target::{ConstraintAnchor, ManagedConstraint, TargetId};
pub use tree::{LayoutConstraint, ViewTree, find_active_input};
