#![forbid(unsafe_code)]

//! Per-consumer layout synchronization.
//!
//! A [`LayoutSynchronizer`] is owned by one consumer (a screen, a form, a
//! dialog). It holds the consumer's managed constraints and views, their
//! baselines, and the margin, and reacts to every normalized keyboard change
//! by moving the managed targets so the active input element stays clear of
//! the keyboard.
//!
//! # Per-event algorithm
//!
//! 1. Find the active input element (pre-order search from the root).
//! 2. Restore constraints to baseline and flush layout.
//! 3. On a hidden→visible edge, re-capture view baselines if the view
//!    structure changed since the last capture.
//! 4. Restore views to baseline.
//! 5. Measure the overlap of the keyboard's final frame with the element.
//! 6. Hand the shifted values to the animator as one batch.
//! 7. When a hide that was not caused by rotation finishes, release focus.
//!
//! # Invariants
//!
//! 1. Every managed target has a baseline before its first adjustment, and
//!    every write is computed from that baseline.
//! 2. At most one transition is in flight; a newer change supersedes it and
//!    the superseded completion is ignored.
//! 3. The synchronizer lock is never held while the animator or the host's
//!    focus handling runs.
//!
//! # Failure Modes
//!
//! - Enabling handling without targets: [`KeyboardError::MisconfiguredConsumer`],
//!   logged at error level.
//! - A target losing its baseline while handling is enabled: logged at error
//!   level, then a panic. The layout would otherwise drift permanently.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use kbshift_core::{BusEvent, CenterShift, EventKind, KeyboardChange, KeyboardStateHandle, LayoutPolicy};
use kbshift_runtime::{
    AnimationCompletion, AnimationOutcome, AnimationSpec, BusHandler, ConsumerId, SubscriptionRegistry,
    TransitionAnimator, TransitionHandle, TransitionSlot,
};

use crate::baseline::OriginalValueStore;
use crate::constraints::{ConstantWrite, ConstraintTargets};
use crate::error::{KeyboardError, Result};
use crate::frames::{FrameTargets, OriginWrite};
use crate::overlap::keyboard_overlap;
use crate::target::{ManagedConstraint, TargetId};
use crate::tree::{ViewTree, find_active_input};

struct Inner<V> {
    handles_keyboard: bool,
    margin: f64,
    center_shift: CenterShift,
    resnapshot_on_show: bool,
    constraints: ConstraintTargets,
    views: FrameTargets<V>,
    store: OriginalValueStore,
    active_input: Option<V>,
    keyboard_was_visible: bool,
    structure_version: u64,
    last_transition: Option<TransitionHandle>,
}

impl<V: Clone> Inner<V> {
    fn has_targets(&self) -> bool {
        !self.constraints.is_empty() || !self.views.is_empty()
    }

    fn capture<T: ViewTree<View = V> + ?Sized>(&mut self, tree: &T) -> Result<usize> {
        let mut entries = self.constraints.snapshot();
        entries.extend(self.views.snapshot(tree));
        let count = self.store.capture(entries)?;
        self.structure_version = tree.structure_version();
        Ok(count)
    }

    fn restore_constraints<T: ViewTree<View = V> + ?Sized>(&self, tree: &T) -> Result<()> {
        if self.constraints.is_empty() {
            return Ok(());
        }
        for write in self.constraints.plan(&self.store, None, self.center_shift)? {
            write.apply();
        }
        tree.layout_if_needed();
        Ok(())
    }

    fn restore_views<T: ViewTree<View = V> + ?Sized>(&self, tree: &T) -> Result<()> {
        for write in self.views.plan(&self.store, None)? {
            write.apply(tree);
        }
        Ok(())
    }
}

/// Moves one consumer's managed targets out of the keyboard's way.
pub struct LayoutSynchronizer<T: ViewTree> {
    consumer: ConsumerId,
    me: Weak<Self>,
    tree: Arc<T>,
    keyboard: KeyboardStateHandle,
    registry: Arc<SubscriptionRegistry>,
    animator: Arc<dyn TransitionAnimator>,
    slot: TransitionSlot,
    inner: Mutex<Inner<T::View>>,
}

impl<T: ViewTree + 'static> LayoutSynchronizer<T> {
    /// Create a synchronizer with the default layout policy.
    pub fn new(
        tree: Arc<T>,
        keyboard: KeyboardStateHandle,
        registry: Arc<SubscriptionRegistry>,
        animator: Arc<dyn TransitionAnimator>,
    ) -> Arc<Self> {
        Self::with_policy(tree, keyboard, registry, animator, &LayoutPolicy::default())
    }

    /// Create a synchronizer using `policy` for margin and shift rules.
    ///
    /// Handling starts disabled; register targets, then call
    /// [`set_handles_keyboard`](Self::set_handles_keyboard).
    pub fn with_policy(
        tree: Arc<T>,
        keyboard: KeyboardStateHandle,
        registry: Arc<SubscriptionRegistry>,
        animator: Arc<dyn TransitionAnimator>,
        policy: &LayoutPolicy,
    ) -> Arc<Self> {
        let consumer = ConsumerId::next();
        Arc::new_cyclic(|me| Self {
            consumer,
            me: me.clone(),
            tree,
            keyboard,
            registry,
            animator,
            slot: TransitionSlot::new(),
            inner: Mutex::new(Inner {
                handles_keyboard: false,
                margin: policy.margin,
                center_shift: policy.center_shift,
                resnapshot_on_show: policy.resnapshot_on_show,
                constraints: ConstraintTargets::default(),
                views: FrameTargets::default(),
                store: OriginalValueStore::new(consumer),
                active_input: None,
                keyboard_was_visible: false,
                structure_version: 0,
                last_transition: None,
            }),
        })
    }

    /// Identity under which this synchronizer subscribes.
    pub fn consumer_id(&self) -> ConsumerId {
        self.consumer
    }

    /// The consumer's view tree.
    pub fn tree(&self) -> &Arc<T> {
        &self.tree
    }

    /// Replace the managed constraints.
    ///
    /// While handling is enabled the previous targets are restored and the
    /// whole set is re-captured.
    pub fn set_managed_constraints(&self, constraints: Vec<ManagedConstraint>) -> Result<()> {
        let targets = ConstraintTargets::new(constraints)?;
        self.retarget(|inner| inner.constraints = targets)
    }

    /// Replace the managed views.
    pub fn set_managed_views(&self, views: Vec<T::View>) -> Result<()> {
        let targets = FrameTargets::new(views);
        self.retarget(|inner| inner.views = targets)
    }

    fn retarget(&self, apply: impl FnOnce(&mut Inner<T::View>)) -> Result<()> {
        let mut inner = self.lock();
        if !inner.handles_keyboard {
            apply(&mut *inner);
            return Ok(());
        }

        self.slot.cancel();
        inner.restore_constraints(&*self.tree)?;
        inner.restore_views(&*self.tree)?;

        let previous_constraints = inner.constraints.clone();
        let previous_views = inner.views.clone();
        apply(&mut *inner);
        if !inner.has_targets() {
            inner.constraints = previous_constraints;
            inner.views = previous_views;
            return Err(self.misconfigured("managed targets cannot be emptied while handling the keyboard"));
        }

        inner.store.clear();
        inner.capture(&*self.tree)?;
        Ok(())
    }

    /// Gap kept between the keyboard and the active input element.
    pub fn keyboard_margin(&self) -> f64 {
        self.lock().margin
    }

    /// Override the margin for this consumer.
    ///
    /// The margin must be finite and non-negative, the same range
    /// [`KeyboardPolicy::validate`](kbshift_core::KeyboardPolicy::validate)
    /// accepts. The current margin is kept on error.
    pub fn set_keyboard_margin(&self, margin: f64) -> Result<()> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(KeyboardError::InvalidMargin {
                consumer: self.consumer,
                margin,
            });
        }
        self.lock().margin = margin;
        Ok(())
    }

    /// Returns `true` while keyboard handling is enabled.
    pub fn handles_keyboard(&self) -> bool {
        self.lock().handles_keyboard
    }

    /// Enable or disable keyboard handling.
    ///
    /// Enabling captures baselines and subscribes to keyboard changes; it
    /// fails with [`KeyboardError::MisconfiguredConsumer`] if no target is
    /// registered. Disabling cancels the in-flight transition, restores
    /// every target, unsubscribes and clears the baselines.
    pub fn set_handles_keyboard(&self, enabled: bool) -> Result<()> {
        if enabled { self.enable() } else { self.disable() }
    }

    fn enable(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.handles_keyboard {
                return Ok(());
            }
            if !inner.has_targets() {
                return Err(self.misconfigured("no managed constraints or views registered"));
            }
            let count = inner.capture(&*self.tree)?;
            inner.keyboard_was_visible = self.keyboard.is_keyboard_visible();
            inner.handles_keyboard = true;
            tracing::debug!(consumer = %self.consumer, baselines = count, "Keyboard handling enabled");
        }
        self.registry
            .register(self.consumer, &[EventKind::KeyboardDidChange], self.me.clone());
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        self.registry.unregister(self.consumer);
        self.slot.cancel();

        let mut inner = self.lock();
        if !inner.handles_keyboard {
            return Ok(());
        }
        inner.handles_keyboard = false;
        let restored = inner
            .restore_constraints(&*self.tree)
            .and_then(|()| inner.restore_views(&*self.tree));
        inner.store.clear();
        inner.active_input = None;
        tracing::debug!(consumer = %self.consumer, "Keyboard handling disabled");
        restored
    }

    /// Write every baseline back immediately. Safe to repeat.
    pub fn restore_baselines(&self) -> Result<()> {
        let inner = self.lock();
        if !inner.store.is_captured() {
            return Ok(());
        }
        inner.restore_constraints(&*self.tree)?;
        inner.restore_views(&*self.tree)
    }

    /// Recorded baseline of one target.
    pub fn baseline(&self, target: &TargetId) -> Result<f64> {
        self.lock().store.restore(target)
    }

    /// Cancel the in-flight transition. Returns `false` if none was running.
    pub fn cancel_transition(&self) -> bool {
        let cancelled = self.slot.cancel();
        if cancelled {
            tracing::debug!(consumer = %self.consumer, "Cancelled keyboard transition");
        }
        cancelled
    }

    /// Handle of the most recently started transition.
    pub fn last_transition(&self) -> Option<TransitionHandle> {
        self.lock().last_transition.clone()
    }

    /// The input element found by the last handled change, until focus is
    /// released.
    pub fn active_input(&self) -> Option<T::View> {
        self.lock().active_input.clone()
    }

    /// Synchronize layout with one normalized keyboard change.
    pub fn handle_change(&self, change: &KeyboardChange) {
        let event = change.event;
        let visible = change.state.is_visible();
        let tree = &*self.tree;

        let (ticket, constants, origins) = {
            let mut inner = self.lock();
            if !inner.handles_keyboard {
                return;
            }

            inner.active_input = find_active_input(tree, &tree.root());

            self.fail_loudly(inner.restore_constraints(tree));
            let edge = visible && !inner.keyboard_was_visible;
            if edge && inner.resnapshot_on_show {
                let version = tree.structure_version();
                if version != inner.structure_version {
                    let views = inner.views.snapshot(tree);
                    inner.store.recapture(views);
                    inner.structure_version = version;
                    tracing::debug!(consumer = %self.consumer, version, "Re-captured view baselines");
                }
            }
            self.fail_loudly(inner.restore_views(tree));

            let overlap = if event.is_presenting() {
                let keyboard = tree.convert_from_screen(event.final_rect());
                inner
                    .active_input
                    .as_ref()
                    .and_then(|input| keyboard_overlap(keyboard, tree.frame_in_root(input), inner.margin))
            } else {
                None
            };

            let constants = self.fail_loudly(inner.constraints.plan(&inner.store, overlap, inner.center_shift));
            let origins = self.fail_loudly(inner.views.plan(&inner.store, overlap));

            let ticket = self.slot.begin();
            inner.last_transition = Some(ticket.handle.clone());
            tracing::debug!(
                consumer = %self.consumer,
                generation = ticket.generation,
                presenting = event.is_presenting(),
                for_rotation = event.for_rotation(),
                overlap = overlap.unwrap_or(0.0),
                "Synchronizing layout with keyboard"
            );
            (ticket, constants, origins)
        };

        let batch_tree = Arc::clone(&self.tree);
        let changes = Box::new(move || apply_batch(&*batch_tree, &constants, &origins));

        let me = self.me.clone();
        let generation = ticket.generation;
        let for_rotation = event.for_rotation();
        let completion = AnimationCompletion::new(ticket.handle, move |outcome| {
            if let Some(me) = me.upgrade() {
                me.on_transition_complete(generation, outcome, visible, for_rotation);
            }
        });

        self.animator
            .animate(AnimationSpec::from_event(&event), ticket.token, changes, completion);
    }

    fn on_transition_complete(&self, generation: u64, outcome: AnimationOutcome, visible: bool, for_rotation: bool) {
        if !self.slot.finish(generation) || outcome != AnimationOutcome::Finished {
            tracing::trace!(consumer = %self.consumer, generation, ?outcome, "Ignoring stale keyboard transition");
            return;
        }

        let release = {
            let mut inner = self.lock();
            inner.keyboard_was_visible = visible;
            if !visible && !for_rotation {
                inner.active_input.take()
            } else {
                None
            }
        };

        if let Some(input) = release {
            tracing::debug!(consumer = %self.consumer, "Releasing input focus after keyboard hide");
            self.tree.resign_input(&input);
        }
    }

    fn misconfigured(&self, reason: &'static str) -> KeyboardError {
        let err = KeyboardError::MisconfiguredConsumer {
            consumer: self.consumer,
            reason,
        };
        tracing::error!(consumer = %self.consumer, error = %err, "Keyboard handling misconfigured");
        err
    }

    fn fail_loudly<R>(&self, result: Result<R>) -> R {
        match result {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(consumer = %self.consumer, error = %err, "Managed layout target lost its baseline");
                panic!("{err}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T::View>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn apply_batch<T: ViewTree + ?Sized>(tree: &T, constants: &[ConstantWrite], origins: &[OriginWrite<T::View>]) {
    for write in constants {
        write.apply();
    }
    if !constants.is_empty() {
        tree.layout_if_needed();
    }
    for write in origins {
        write.apply(tree);
    }
}

impl<T: ViewTree + 'static> BusHandler for LayoutSynchronizer<T> {
    fn handle_event(&self, event: &BusEvent) {
        if let BusEvent::KeyboardDidChange(change) = event {
            self.handle_change(change);
        }
    }
}

impl<T: ViewTree> Drop for LayoutSynchronizer<T> {
    fn drop(&mut self) {
        self.registry.unregister(self.consumer);
        self.slot.cancel();
    }
}

impl<T: ViewTree> std::fmt::Debug for LayoutSynchronizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutSynchronizer")
            .field("consumer", &self.consumer)
            .field("transition_active", &self.slot.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneTree, SceneView, SharedConstraint};
    use crate::tree::LayoutConstraint;
    use kbshift_core::{FixedWindow, KeyboardPolicy, RawPayload, Rect, TransitionKind};
    use kbshift_runtime::{EventBus, ImmediateAnimator, KeyboardService, LocalBus};

    const PARKED: Rect = Rect::new(0.0, 800.0, 400.0, 300.0);

    fn keyboard(height: f64) -> Rect {
        Rect::new(0.0, 800.0 - height, 400.0, height)
    }

    struct Fixture {
        bus: Arc<LocalBus>,
        _service: Arc<KeyboardService<FixedWindow>>,
        scene: Arc<SceneTree>,
        field: SceneView,
        sync: Arc<LayoutSynchronizer<SceneTree>>,
    }

    fn fixture() -> Fixture {
        let bus = Arc::new(LocalBus::new());
        let registry = Arc::new(SubscriptionRegistry::new(bus.clone()));
        let service = KeyboardService::start(
            FixedWindow::from_size(400.0, 800.0),
            &KeyboardPolicy::default(),
            Arc::clone(&registry),
        );
        let scene = Arc::new(SceneTree::new(Rect::from_size(400.0, 800.0)));
        let root = scene.root();
        let field = scene.add_child(&root, Rect::new(20.0, 450.0, 200.0, 300.0));
        scene.focus(&field);
        let sync = LayoutSynchronizer::new(
            Arc::clone(&scene),
            service.state(),
            registry,
            Arc::new(ImmediateAnimator),
        );
        Fixture {
            bus,
            _service: service,
            scene,
            field,
            sync,
        }
    }

    fn post(bus: &LocalBus, kind: TransitionKind, from: Rect, to: Rect) {
        bus.post(BusEvent::Keyboard {
            kind,
            payload: RawPayload::new(from, to, 0.25, 7),
        });
    }

    #[test]
    fn missing_targets_are_a_configuration_error() {
        let f = fixture();
        let err = f.sync.set_handles_keyboard(true).unwrap_err();
        assert!(matches!(err, KeyboardError::MisconfiguredConsumer { .. }));
        assert!(!f.sync.handles_keyboard());
        assert_eq!(f.bus.subscriber_count_for(EventKind::KeyboardDidChange), 0);
    }

    #[test]
    fn enabling_is_idempotent_and_subscribes_once() {
        let f = fixture();
        f.sync
            .set_managed_constraints(vec![ManagedConstraint::bottom(SharedConstraint::new(20.0))])
            .unwrap();
        f.sync.set_handles_keyboard(true).unwrap();
        f.sync.set_handles_keyboard(true).unwrap();
        assert_eq!(f.bus.subscriber_count_for(EventKind::KeyboardDidChange), 1);
    }

    #[test]
    fn margin_override_changes_overlap() {
        let f = fixture();
        let bottom = SharedConstraint::new(20.0);
        f.sync
            .set_managed_constraints(vec![ManagedConstraint::bottom(bottom.clone())])
            .unwrap();
        f.sync.set_keyboard_margin(0.0).unwrap();
        f.sync.set_handles_keyboard(true).unwrap();

        post(&f.bus, TransitionKind::WillShow, PARKED, keyboard(300.0));
        assert_eq!(bottom.constant(), 270.0);
        assert_eq!(f.sync.keyboard_margin(), 0.0);
    }

    #[test]
    fn invalid_margin_is_rejected_and_previous_kept() {
        let f = fixture();
        f.sync.set_keyboard_margin(12.0).unwrap();

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = f.sync.set_keyboard_margin(bad).unwrap_err();
            assert!(matches!(err, KeyboardError::InvalidMargin { .. }));
        }
        assert_eq!(f.sync.keyboard_margin(), 12.0);
    }

    #[test]
    fn retargeting_while_enabled_restores_and_recaptures() {
        let f = fixture();
        let first = SharedConstraint::new(20.0);
        let second = SharedConstraint::new(8.0);
        f.sync
            .set_managed_constraints(vec![ManagedConstraint::bottom(first.clone())])
            .unwrap();
        f.sync.set_handles_keyboard(true).unwrap();
        post(&f.bus, TransitionKind::WillShow, PARKED, keyboard(300.0));
        assert_eq!(first.constant(), 310.0);

        f.sync
            .set_managed_constraints(vec![ManagedConstraint::bottom(second.clone()).with_id("second")])
            .unwrap();
        assert_eq!(first.constant(), 20.0);
        assert_eq!(
            f.sync.baseline(&TargetId::Constraint("second".into())).unwrap(),
            8.0
        );

        let err = f.sync.set_managed_constraints(Vec::new()).unwrap_err();
        assert!(matches!(err, KeyboardError::MisconfiguredConsumer { .. }));
        assert!(f.sync.baseline(&TargetId::Constraint("second".into())).is_ok());
    }

    #[test]
    fn resnapshot_on_show_follows_structure_changes() {
        let f = fixture();
        let root = f.scene.root();
        let form = f.scene.add_child(&root, Rect::new(0.0, 400.0, 400.0, 400.0));
        f.sync.set_managed_views(vec![form]).unwrap();
        f.sync.set_handles_keyboard(true).unwrap();

        // Host relayouts while the keyboard is hidden.
        f.scene.add_child(&root, Rect::ZERO);
        f.scene.set_frame(&form, Rect::new(0.0, 450.0, 400.0, 350.0));

        post(&f.bus, TransitionKind::WillShow, PARKED, keyboard(300.0));
        assert_eq!(f.sync.baseline(&TargetId::View(0)).unwrap(), 450.0);
        assert_eq!(f.scene.frame(&form).y, 450.0 - 290.0);
    }

    #[test]
    #[should_panic(expected = "no baseline recorded")]
    fn lost_baseline_fails_loudly() {
        let f = fixture();
        f.sync
            .set_managed_constraints(vec![ManagedConstraint::bottom(SharedConstraint::new(20.0))])
            .unwrap();
        f.sync.set_handles_keyboard(true).unwrap();
        f.sync.lock().store.remove(&TargetId::Constraint("constraint-0".into()));

        post(&f.bus, TransitionKind::WillShow, PARKED, keyboard(300.0));
    }

    #[test]
    fn dropping_synchronizer_unsubscribes() {
        let f = fixture();
        f.sync
            .set_managed_views(vec![f.field])
            .unwrap();
        f.sync.set_handles_keyboard(true).unwrap();
        assert_eq!(f.bus.subscriber_count_for(EventKind::KeyboardDidChange), 1);
        drop(f.sync);
        assert_eq!(f.bus.subscriber_count_for(EventKind::KeyboardDidChange), 0);
    }
}
