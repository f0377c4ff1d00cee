#![forbid(unsafe_code)]

//! Keyboard transition payloads and the immutable [`TransitionEvent`].
//!
//! The platform reports every keyboard show, hide or resize as a loosely
//! typed payload. [`TransitionEvent::try_from_payload`] is the only way to
//! turn one into a typed event: a payload missing any of the four required
//! fields (initial frame, final frame, duration, curve) yields no event and
//! the caller drops it.
//!
//! # Invariants
//!
//! 1. A `TransitionEvent` always has finite rectangles and a non-negative
//!    duration.
//! 2. Animation options always contain
//!    [`AnimationOptions::BEGIN_FROM_CURRENT_STATE`], so a transition that
//!    interrupts another starts from the on-screen position.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::geometry::Rect;

/// Which platform signal produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// The keyboard is about to appear.
    WillShow,
    /// The keyboard is about to disappear.
    WillHide,
    /// The keyboard frame is about to change (show, hide or resize).
    WillChangeFrame,
}

/// Raw transition payload as delivered by the platform event bus.
///
/// Every field is optional on the wire; see [`TransitionEvent::try_from_payload`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPayload {
    /// Keyboard frame when the transition begins, in screen coordinates.
    pub frame_begin: Option<Rect>,
    /// Keyboard frame when the transition ends, in screen coordinates.
    pub frame_end: Option<Rect>,
    /// Transition duration in seconds.
    pub duration: Option<f64>,
    /// Platform animation curve identifier.
    pub curve: Option<u32>,
}

impl RawPayload {
    /// A payload with every required field present.
    pub fn new(frame_begin: Rect, frame_end: Rect, duration: f64, curve: u32) -> Self {
        Self {
            frame_begin: Some(frame_begin),
            frame_end: Some(frame_end),
            duration: Some(duration),
            curve: Some(curve),
        }
    }
}

bitflags! {
    /// Opaque animation option bag handed to the host's animator.
    ///
    /// The curve occupies bits 16..=19, so identifiers up to
    /// [`AnimationOptions::MAX_CURVE`] are representable. Unknown identifiers
    /// in that range are retained verbatim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AnimationOptions: u32 {
        /// Lay out subviews while animating.
        const LAYOUT_SUBVIEWS = 1 << 0;
        /// Keep accepting input while animating.
        const ALLOW_USER_INTERACTION = 1 << 1;
        /// Start from the current presentation state of an interrupted animation.
        const BEGIN_FROM_CURRENT_STATE = 1 << 2;
        /// Ease-in curve.
        const CURVE_EASE_IN = 1 << 16;
        /// Ease-out curve.
        const CURVE_EASE_OUT = 2 << 16;
        /// Linear curve.
        const CURVE_LINEAR = 3 << 16;
    }
}

impl AnimationOptions {
    const CURVE_SHIFT: u32 = 16;
    const CURVE_MASK: u32 = Self::MAX_CURVE << Self::CURVE_SHIFT;

    /// Largest curve identifier the bag can carry.
    pub const MAX_CURVE: u32 = 0xF;

    /// Build the option bag for a platform curve identifier, or `None` if
    /// it does not fit the curve bits.
    pub fn from_curve(curve: u32) -> Option<Self> {
        if curve > Self::MAX_CURVE {
            return None;
        }
        Some(Self::from_bits_retain(curve << Self::CURVE_SHIFT) | Self::BEGIN_FROM_CURRENT_STATE)
    }

    /// The platform curve identifier stored in the bag.
    pub fn curve(&self) -> u32 {
        (self.bits() & Self::CURVE_MASK) >> Self::CURVE_SHIFT
    }
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self::BEGIN_FROM_CURRENT_STATE
    }
}

/// Why a payload could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// A required field was absent.
    #[error("keyboard payload is missing `{0}`")]
    MissingField(&'static str),
    /// A rectangle contained NaN or an infinity.
    #[error("keyboard payload field `{0}` is not a finite rectangle")]
    NonFiniteRect(&'static str),
    /// The duration was negative, NaN or out of range.
    #[error("keyboard payload duration {0} is not a valid number of seconds")]
    InvalidDuration(f64),
    /// The curve identifier does not fit the option bag.
    #[error("keyboard payload curve {0} exceeds the largest curve identifier")]
    InvalidCurve(u32),
}

/// Immutable snapshot of one keyboard transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEvent {
    initial_rect: Rect,
    final_rect: Rect,
    duration: Duration,
    options: AnimationOptions,
    is_presenting: bool,
    for_rotation: bool,
}

impl TransitionEvent {
    /// Decode a raw payload.
    ///
    /// `is_presenting` is provisional until the tracker reconciles it with the
    /// window geometry: `WillShow` presents, `WillHide` dismisses, and
    /// `WillChangeFrame` presents iff the final frame has positive height.
    pub fn try_from_payload(kind: TransitionKind, payload: &RawPayload) -> Result<Self, PayloadError> {
        let initial_rect = payload
            .frame_begin
            .ok_or(PayloadError::MissingField("frame_begin"))?;
        let final_rect = payload
            .frame_end
            .ok_or(PayloadError::MissingField("frame_end"))?;
        let seconds = payload
            .duration
            .ok_or(PayloadError::MissingField("duration"))?;
        let curve = payload.curve.ok_or(PayloadError::MissingField("curve"))?;

        if !initial_rect.is_finite() {
            return Err(PayloadError::NonFiniteRect("frame_begin"));
        }
        if !final_rect.is_finite() {
            return Err(PayloadError::NonFiniteRect("frame_end"));
        }
        let duration =
            Duration::try_from_secs_f64(seconds).map_err(|_| PayloadError::InvalidDuration(seconds))?;
        let options = AnimationOptions::from_curve(curve).ok_or(PayloadError::InvalidCurve(curve))?;

        let is_presenting = match kind {
            TransitionKind::WillShow => true,
            TransitionKind::WillHide => false,
            TransitionKind::WillChangeFrame => final_rect.height > 0.0,
        };

        Ok(Self {
            initial_rect,
            final_rect,
            duration,
            options,
            is_presenting,
            for_rotation: false,
        })
    }

    /// Decode a raw payload, discarding the reason on failure.
    pub fn from_payload(kind: TransitionKind, payload: &RawPayload) -> Option<Self> {
        Self::try_from_payload(kind, payload).ok()
    }

    /// Keyboard frame when the transition began, in screen coordinates.
    #[inline]
    pub fn initial_rect(&self) -> Rect {
        self.initial_rect
    }

    /// Keyboard frame when the transition ends, in screen coordinates.
    #[inline]
    pub fn final_rect(&self) -> Rect {
        self.final_rect
    }

    /// Transition duration.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Animation options, including the curve.
    #[inline]
    pub fn options(&self) -> AnimationOptions {
        self.options
    }

    /// Whether the keyboard ends the transition on screen.
    #[inline]
    pub fn is_presenting(&self) -> bool {
        self.is_presenting
    }

    /// Whether the transition was reported during an orientation change.
    #[inline]
    pub fn for_rotation(&self) -> bool {
        self.for_rotation
    }

    pub(crate) fn with_presenting(mut self, is_presenting: bool) -> Self {
        self.is_presenting = is_presenting;
        self
    }

    pub(crate) fn with_rotation(mut self, for_rotation: bool) -> Self {
        self.for_rotation = for_rotation;
        self
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Keyboard transition: {{initial: {}, final: {}, duration: {:?}, curve: {}, presenting: {}, rotation: {}}}",
            self.initial_rect,
            self.final_rect,
            self.duration,
            self.options.curve(),
            self.is_presenting,
            self.for_rotation
        )
    }
}
