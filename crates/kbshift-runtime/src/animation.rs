#![forbid(unsafe_code)]

//! Animated, cancellable layout transitions.
//!
//! A layout synchronizer hands its value changes to a [`TransitionAnimator`]
//! as one batch, together with the transition's duration and option bag. The
//! host animator runs the batch on the UI-owning thread and reports back
//! through an [`AnimationCompletion`].
//!
//! # At most one active transition per consumer
//!
//! [`TransitionSlot`] enforces this. [`TransitionSlot::begin`] cancels the
//! in-flight transition (if any) before issuing a new ticket, and
//! [`TransitionSlot::finish`] only accepts the completion of the current
//! generation. A superseded animation therefore never runs its completion
//! logic against the consumer.
//!
//! # Failure Modes
//!
//! - Animator drops the completion without calling it: the transition is
//!   reported as [`AnimationOutcome::Cancelled`].
//! - Token cancelled before the animator starts: the batch is skipped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use kbshift_core::{AnimationOptions, TransitionEvent};
use web_time::{Duration, Instant};

use crate::cancellation::{CancellationSource, CancellationToken};

/// Timing for one animated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSpec {
    /// How long the animation runs.
    pub duration: Duration,
    /// Curve and options reported by the platform.
    pub options: AnimationOptions,
}

impl AnimationSpec {
    /// Use the timing reported by a keyboard transition.
    pub fn from_event(event: &TransitionEvent) -> Self {
        Self {
            duration: event.duration(),
            options: event.options(),
        }
    }
}

/// How an animated batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// The batch was applied and the animation ran to completion.
    Finished,
    /// The batch was cancelled or superseded.
    Cancelled,
}

/// The value changes of one transition, applied inside the animation block.
pub type LayoutChanges = Box<dyn FnOnce() + Send>;

/// Host-side animation seam.
///
/// Implementations must run `changes` (at most once) and `completion` on the
/// UI-owning thread. If `token` is cancelled before `changes` run, they
/// should skip them and complete with [`AnimationOutcome::Cancelled`].
pub trait TransitionAnimator: Send + Sync {
    /// Animate one batch.
    fn animate(
        &self,
        spec: AnimationSpec,
        token: CancellationToken,
        changes: LayoutChanges,
        completion: AnimationCompletion,
    );
}

struct HandleState {
    outcome: Mutex<Option<AnimationOutcome>>,
    done: Condvar,
}

/// Awaitable view of one transition.
#[derive(Clone)]
pub struct TransitionHandle {
    generation: u64,
    state: Arc<HandleState>,
}

impl TransitionHandle {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            state: Arc::new(HandleState {
                outcome: Mutex::new(None),
                done: Condvar::new(),
            }),
        }
    }

    /// Generation number within its slot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The outcome, if the transition has completed.
    pub fn outcome(&self) -> Option<AnimationOutcome> {
        *self.state.outcome.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns `true` once the transition has completed either way.
    pub fn is_complete(&self) -> bool {
        self.outcome().is_some()
    }

    /// Block until the transition completes or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AnimationOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.state.outcome.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if outcome.is_some() {
                return *outcome;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            outcome = self
                .state
                .done
                .wait_timeout(outcome, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
    }

    fn resolve(&self, outcome: AnimationOutcome) {
        let mut slot = self.state.outcome.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(outcome);
            self.state.done.notify_all();
        }
    }
}

impl std::fmt::Debug for TransitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionHandle")
            .field("generation", &self.generation)
            .field("outcome", &self.outcome())
            .finish()
    }
}

type CompletionFn = Box<dyn FnOnce(AnimationOutcome) + Send>;

/// One-shot completion callback for an animated batch.
///
/// Dropping it without calling [`complete`](Self::complete) reports
/// [`AnimationOutcome::Cancelled`].
pub struct AnimationCompletion {
    handle: TransitionHandle,
    callback: Option<CompletionFn>,
}

impl AnimationCompletion {
    /// Wrap `callback` so it also resolves `handle`.
    pub fn new(handle: TransitionHandle, callback: impl FnOnce(AnimationOutcome) + Send + 'static) -> Self {
        Self {
            handle,
            callback: Some(Box::new(callback)),
        }
    }

    /// Report how the animation ended.
    pub fn complete(mut self, outcome: AnimationOutcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: AnimationOutcome) {
        if let Some(callback) = self.callback.take() {
            self.handle.resolve(outcome);
            callback(outcome);
        }
    }
}

impl Drop for AnimationCompletion {
    fn drop(&mut self) {
        self.fire(AnimationOutcome::Cancelled);
    }
}

/// Ticket for a newly started transition.
#[derive(Debug)]
pub struct TransitionTicket {
    /// Generation number; pass it back to [`TransitionSlot::finish`].
    pub generation: u64,
    /// Token the animator should observe.
    pub token: CancellationToken,
    /// Awaitable handle shared with the caller.
    pub handle: TransitionHandle,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    source: CancellationSource,
}

/// Per-consumer slot holding at most one in-flight transition.
#[derive(Debug, Default)]
pub struct TransitionSlot {
    next_generation: AtomicU64,
    current: Mutex<Option<InFlight>>,
}

impl TransitionSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transition, cancelling the one in flight.
    pub fn begin(&self) -> TransitionTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let source = CancellationSource::new();
        let token = source.token();
        let previous = self.lock().replace(InFlight { generation, source });
        if let Some(previous) = previous {
            tracing::trace!(
                superseded = previous.generation,
                generation,
                "Superseding in-flight keyboard transition"
            );
            previous.source.cancel();
        }
        TransitionTicket {
            generation,
            token,
            handle: TransitionHandle::new(generation),
        }
    }

    /// Retire `generation` if it is still current.
    ///
    /// Returns `false` for a superseded or cancelled generation.
    pub fn finish(&self, generation: u64) -> bool {
        let mut current = self.lock();
        match current.as_ref() {
            Some(in_flight) if in_flight.generation == generation => {
                *current = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the in-flight transition. Returns `false` if there was none.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(in_flight) => {
                in_flight.source.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a transition is in flight.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<InFlight>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Applies every batch synchronously, without animating.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateAnimator;

impl TransitionAnimator for ImmediateAnimator {
    fn animate(
        &self,
        _spec: AnimationSpec,
        token: CancellationToken,
        changes: LayoutChanges,
        completion: AnimationCompletion,
    ) {
        if token.is_cancelled() {
            completion.complete(AnimationOutcome::Cancelled);
            return;
        }
        changes();
        completion.complete(AnimationOutcome::Finished);
    }
}

struct Pending {
    spec: AnimationSpec,
    token: CancellationToken,
    changes: LayoutChanges,
    completion: AnimationCompletion,
}

/// Queues batches until the host drains them from its frame loop.
///
/// Hosts that drive animation from a per-frame callback call
/// [`run_pending`](Self::run_pending) on the UI thread.
#[derive(Default)]
pub struct QueuedAnimator {
    pending: Mutex<VecDeque<Pending>>,
}

impl QueuedAnimator {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued batches.
    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    /// Durations of the queued batches, oldest first.
    pub fn pending_specs(&self) -> Vec<AnimationSpec> {
        self.lock().iter().map(|p| p.spec).collect()
    }

    /// Apply every queued batch whose token is still live and complete all of
    /// them. Returns the number that finished.
    pub fn run_pending(&self) -> usize {
        let drained: Vec<Pending> = self.lock().drain(..).collect();
        let mut finished = 0;
        for pending in drained {
            if pending.token.is_cancelled() {
                pending.completion.complete(AnimationOutcome::Cancelled);
                continue;
            }
            (pending.changes)();
            pending.completion.complete(AnimationOutcome::Finished);
            finished += 1;
        }
        finished
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Pending>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TransitionAnimator for QueuedAnimator {
    fn animate(
        &self,
        spec: AnimationSpec,
        token: CancellationToken,
        changes: LayoutChanges,
        completion: AnimationCompletion,
    ) {
        self.lock().push_back(Pending {
            spec,
            token,
            changes,
            completion,
        });
    }
}

impl std::fmt::Debug for QueuedAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedAnimator")
            .field("pending", &self.pending_len())
            .finish()
    }
}
