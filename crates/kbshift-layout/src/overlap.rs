#![forbid(unsafe_code)]

//! Overlap between the keyboard and the active input element.
//!
//! Both rectangles must be in the same (consumer) coordinate space. The
//! overlap is the height of their intersection, padded by the margin:
//!
//! ```text
//! overlap = height(keyboard ∩ element) + margin
//! ```
//!
//! The margin only pads a real intersection. An element that sits above
//! the keyboard, however close, has no overlap.

use kbshift_core::{CenterShift, Rect};

use crate::target::ConstraintAnchor;

/// Positive overlap, or `None` if no adjustment is needed.
pub fn keyboard_overlap(keyboard: Rect, element: Rect, margin: f64) -> Option<f64> {
    let covered = keyboard.intersection_opt(&element)?;
    let overlap = covered.height + margin;
    overlap.is_finite().then_some(overlap)
}

/// Signed change applied to a constraint's baseline for `overlap`.
#[inline]
pub fn constraint_delta(anchor: ConstraintAnchor, overlap: f64, center_shift: CenterShift) -> f64 {
    match anchor {
        ConstraintAnchor::Bottom => overlap,
        ConstraintAnchor::CenterY => -center_shift.apply(overlap),
    }
}
