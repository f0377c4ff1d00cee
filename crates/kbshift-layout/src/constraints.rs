#![forbid(unsafe_code)]

//! Constraint-based targets.
//!
//! Each managed constraint is shifted from its baseline constant: bottom
//! spacing grows by the overlap, vertical centering shrinks by the
//! configured portion of it.

use std::collections::HashSet;
use std::sync::Arc;

use kbshift_core::CenterShift;

use crate::baseline::OriginalValueStore;
use crate::error::{KeyboardError, Result};
use crate::overlap::constraint_delta;
use crate::target::{ManagedConstraint, TargetId};
use crate::tree::LayoutConstraint;

/// One pending constant write.
#[derive(Clone)]
pub struct ConstantWrite {
    pub(crate) handle: Arc<dyn LayoutConstraint>,
    pub(crate) value: f64,
}

impl ConstantWrite {
    /// The value that will be written.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn apply(&self) {
        self.handle.set_constant(self.value);
    }
}

impl std::fmt::Debug for ConstantWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantWrite").field("value", &self.value).finish()
    }
}

/// Ordered, uniquely named set of managed constraints.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTargets {
    entries: Vec<(TargetId, ManagedConstraint)>,
}

impl ConstraintTargets {
    /// Name each constraint (`constraint-<index>` when unnamed) and reject
    /// duplicate names.
    pub fn new(constraints: Vec<ManagedConstraint>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(constraints.len());
        for (index, constraint) in constraints.into_iter().enumerate() {
            let name = constraint
                .id
                .clone()
                .unwrap_or_else(|| format!("constraint-{index}"));
            let id = TargetId::Constraint(name);
            if !seen.insert(id.clone()) {
                return Err(KeyboardError::DuplicateTarget { target: id });
            }
            entries.push((id, constraint));
        }
        Ok(Self { entries })
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no constraint is managed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &TargetId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Current constant of every constraint.
    pub fn snapshot(&self) -> Vec<(TargetId, f64)> {
        self.entries
            .iter()
            .map(|(id, c)| (id.clone(), c.handle.constant()))
            .collect()
    }

    /// Writes that put every constraint at its baseline shifted for `overlap`.
    ///
    /// With no overlap the writes restore the baselines.
    pub fn plan(
        &self,
        store: &OriginalValueStore,
        overlap: Option<f64>,
        center_shift: CenterShift,
    ) -> Result<Vec<ConstantWrite>> {
        self.entries
            .iter()
            .map(|(id, c)| {
                let baseline = store.restore(id)?;
                let delta = overlap.map_or(0.0, |o| constraint_delta(c.anchor, o, center_shift));
                Ok(ConstantWrite {
                    handle: Arc::clone(&c.handle),
                    value: baseline + delta,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SharedConstraint;
    use kbshift_runtime::ConsumerId;

    #[test]
    fn unnamed_constraints_get_index_names() {
        let targets = ConstraintTargets::new(vec![
            ManagedConstraint::bottom(SharedConstraint::new(20.0)),
            ManagedConstraint::center_y(SharedConstraint::new(0.0)).with_id("center"),
            ManagedConstraint::bottom(SharedConstraint::new(8.0)),
        ])
        .unwrap();
        let ids: Vec<_> = targets.ids().cloned().collect();
        assert_eq!(
            ids,
            vec![
                TargetId::Constraint("constraint-0".into()),
                TargetId::Constraint("center".into()),
                TargetId::Constraint("constraint-2".into()),
            ]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = ConstraintTargets::new(vec![
            ManagedConstraint::bottom(SharedConstraint::new(0.0)).with_id("constraint-1"),
            ManagedConstraint::bottom(SharedConstraint::new(0.0)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            KeyboardError::DuplicateTarget {
                target: TargetId::Constraint("constraint-1".into())
            }
        );
    }

    #[test]
    fn plan_shifts_from_baseline() {
        let bottom = SharedConstraint::new(20.0);
        let center = SharedConstraint::new(0.0);
        let targets = ConstraintTargets::new(vec![
            ManagedConstraint::bottom(bottom.clone()),
            ManagedConstraint::center_y(center.clone()),
        ])
        .unwrap();
        let mut store = OriginalValueStore::new(ConsumerId::from_raw(1));
        store.capture(targets.snapshot()).unwrap();

        // Drifted values are ignored: writes derive from the baseline.
        bottom.set_constant(999.0);
        let writes = targets.plan(&store, Some(290.0), CenterShift::Half).unwrap();
        let values: Vec<f64> = writes.iter().map(ConstantWrite::value).collect();
        assert_eq!(values, vec![310.0, -145.0]);

        let writes = targets.plan(&store, None, CenterShift::Half).unwrap();
        writes.iter().for_each(ConstantWrite::apply);
        assert_eq!(bottom.constant(), 20.0);
        assert_eq!(center.constant(), 0.0);
    }

    #[test]
    fn plan_without_baseline_fails() {
        let targets =
            ConstraintTargets::new(vec![ManagedConstraint::bottom(SharedConstraint::new(20.0))]).unwrap();
        let store = OriginalValueStore::new(ConsumerId::from_raw(1));
        assert!(matches!(
            targets.plan(&store, Some(10.0), CenterShift::Half),
            Err(KeyboardError::MissingBaseline { .. })
        ));
    }
}
