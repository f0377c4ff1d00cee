#![forbid(unsafe_code)]

//! Core: keyboard transitions, keyboard state, and geometry.
//!
//! # Role in kbshift
//! `kbshift-core` is the input layer. It decodes raw keyboard payloads from
//! the platform into immutable [`TransitionEvent`]s and keeps the single
//! [`KeyboardState`] per root window up to date.
//!
//! # Primary responsibilities
//! - **TransitionEvent**: typed snapshot of one show/hide/resize.
//! - **KeyboardStateTracker**: single writer of keyboard visibility and frame,
//!   including the rotation duplicate guard.
//! - **Event vocabulary**: [`BusEvent`] and [`EventKind`] shared with the
//!   runtime's bus.
//! - **Policy**: tunables loadable from TOML/JSON.
//!
//! # How it fits in the system
//! The runtime (`kbshift-runtime`) wires a tracker to an event bus and
//! republishes its [`KeyboardChange`]s; the layout crate (`kbshift-layout`)
//! consumes those changes to move views out of the keyboard's way.

pub mod event;
pub mod geometry;
pub mod policy;
pub mod rotation;
pub mod state;
pub mod tracker;
pub mod transition;
pub mod window;

pub use event::{BusEvent, EventKind, KeyboardChange};
pub use geometry::Rect;
pub use policy::{CenterShift, KeyboardPolicy, LayoutPolicy, PolicyConfigError, RotationPolicy};
pub use state::{KeyboardState, KeyboardStateHandle};
pub use tracker::KeyboardStateTracker;
pub use transition::{AnimationOptions, PayloadError, RawPayload, TransitionEvent, TransitionKind};
pub use window::{FixedWindow, RootWindow};
