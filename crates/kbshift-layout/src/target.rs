#![forbid(unsafe_code)]

//! Managed layout targets and their identifiers.

use std::fmt;
use std::sync::Arc;

use crate::tree::LayoutConstraint;

/// Stable identifier of a managed target within one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    /// A constraint, by name.
    Constraint(String),
    /// A view, by registration index.
    View(usize),
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constraint(name) => write!(f, "constraint `{name}`"),
            Self::View(index) => write!(f, "view #{index}"),
        }
    }
}

/// Which edge a constraint pins, deciding the sign of its shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstraintAnchor {
    /// Bottom spacing: grows by the overlap.
    #[default]
    Bottom,
    /// Vertical centering: shrinks by the center-shift portion of the overlap.
    CenterY,
}

/// A constraint handed to a synchronizer.
#[derive(Clone)]
pub struct ManagedConstraint {
    pub(crate) id: Option<String>,
    pub(crate) anchor: ConstraintAnchor,
    pub(crate) handle: Arc<dyn LayoutConstraint>,
}

impl ManagedConstraint {
    /// A bottom-anchored constraint.
    pub fn bottom(handle: impl LayoutConstraint + 'static) -> Self {
        Self::new(ConstraintAnchor::Bottom, Arc::new(handle))
    }

    /// A vertically centering constraint.
    pub fn center_y(handle: impl LayoutConstraint + 'static) -> Self {
        Self::new(ConstraintAnchor::CenterY, Arc::new(handle))
    }

    /// Wrap an already shared handle.
    pub fn new(anchor: ConstraintAnchor, handle: Arc<dyn LayoutConstraint>) -> Self {
        Self {
            id: None,
            anchor,
            handle,
        }
    }

    /// Name the constraint. Unnamed constraints are called `constraint-<index>`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The anchor.
    pub fn anchor(&self) -> ConstraintAnchor {
        self.anchor
    }

    /// The explicit name, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Debug for ManagedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConstraint")
            .field("id", &self.id)
            .field("anchor", &self.anchor)
            .field("constant", &self.handle.constant())
            .finish()
    }
}
