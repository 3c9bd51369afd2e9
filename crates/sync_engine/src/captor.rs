//! Captor: one stream's queue, locking strategy and capture policy.
//!
//! Producers call [`Captor::insert`] from any thread. A consumer calls
//! [`Captor::capture`] directly or through a
//! [`Synchronizer`](crate::Synchronizer). Both take the same mutex, and a
//! polling capture releases it between checks.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    CaptorConfig, CaptureRange, ContractError, Deadline, Dispatch, Insertion, OverflowPolicy,
    Role, Stamp, State, StreamId,
};
use tracing::{debug, instrument};

use crate::lock::LockingStrategy;
use crate::policy::{CapturePolicy, Located, Policy};
use crate::queue::DispatchQueue;

/// Called with the stream and the dispatch dropped by a full queue.
pub type OverflowMonitor<S, T> = Arc<dyn Fn(&StreamId, &Dispatch<S, T>) + Send + Sync>;

/// Everything guarded by the captor lock
pub(crate) struct CaptorState<S: Stamp, T> {
    queue: DispatchQueue<S, T>,
    policy: Policy<S, T>,
}

impl<S: Stamp, T: Clone> CaptorState<S, T> {
    pub(crate) fn locate(&self, range: &CaptureRange<S>) -> Located<S> {
        self.policy.locate(&self.queue, range)
    }

    pub(crate) fn extract(
        &mut self,
        located: &Located<S>,
        range: &CaptureRange<S>,
    ) -> Vec<Dispatch<S, T>> {
        self.policy.extract(&mut self.queue, located, range)
    }

    pub(crate) fn abort(&mut self, t: S) {
        self.policy.abort(&mut self.queue, t);
    }

    pub(crate) fn remove_before(&mut self, t: S) -> usize {
        self.queue.remove_before(t).len()
    }

    pub(crate) fn reset(&mut self) {
        self.queue.clear();
        self.policy.reset();
    }
}

/// Builder for a [`Captor`]
pub struct CaptorBuilder<S: Stamp, T> {
    stream: StreamId,
    capacity: usize,
    overflow: OverflowPolicy,
    locking: LockingStrategy,
    policy: Option<Policy<S, T>>,
    monitor: Option<OverflowMonitor<S, T>>,
}

impl<S: Stamp, T: Clone + Send> CaptorBuilder<S, T> {
    pub fn new(stream: impl Into<StreamId>) -> Self {
        Self {
            stream: stream.into(),
            capacity: 0,
            overflow: OverflowPolicy::default(),
            locking: LockingStrategy::default(),
            policy: None,
            monitor: None,
        }
    }

    /// Builder preloaded from a config entry, so callers can still attach
    /// a monitor. Policy parameters are validated here.
    pub fn from_config(
        stream: impl Into<StreamId>,
        config: &CaptorConfig<S::Offset>,
    ) -> Result<Self, ContractError> {
        let stream = stream.into();
        let locking = LockingStrategy::from_config(&config.locking)?;
        let policy = Policy::from_config(&config.policy).map_err(|e| match e {
            ContractError::ConfigValidation { field, message } => {
                ContractError::config_validation(format!("{stream}.{field}"), message)
            }
            other => other,
        })?;

        Ok(Self::new(stream)
            .capacity(config.capacity)
            .overflow(config.overflow)
            .locking(locking)
            .policy(policy))
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn locking(mut self, locking: LockingStrategy) -> Self {
        self.locking = locking;
        self
    }

    pub fn policy(mut self, policy: impl Into<Policy<S, T>>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    pub fn monitor<F>(mut self, monitor: F) -> Self
    where
        F: Fn(&StreamId, &Dispatch<S, T>) + Send + Sync + 'static,
    {
        self.monitor = Some(Arc::new(monitor));
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Captor<S, T>, ContractError> {
        if self.capacity == 0 {
            return Err(ContractError::config_validation(
                format!("{}.capacity", self.stream),
                "capacity must be > 0",
            ));
        }
        let policy = self.policy.ok_or_else(|| {
            ContractError::config_validation(format!("{}.policy", self.stream), "policy is required")
        })?;

        Ok(Captor {
            role: policy.role(),
            policy_name: policy.name(),
            stream: self.stream,
            locking: self.locking,
            overflow: self.overflow,
            capacity: self.capacity,
            monitor: self.monitor,
            enrolled: AtomicBool::new(false),
            state: Mutex::new(CaptorState {
                queue: DispatchQueue::new(self.capacity, self.overflow),
                policy,
            }),
        })
    }
}

/// Per-stream capture endpoint
pub struct Captor<S: Stamp, T> {
    stream: StreamId,
    role: Role,
    policy_name: &'static str,
    locking: LockingStrategy,
    overflow: OverflowPolicy,
    capacity: usize,
    monitor: Option<OverflowMonitor<S, T>>,
    /// Set while a synchronizer owns this captor
    enrolled: AtomicBool,
    state: Mutex<CaptorState<S, T>>,
}

impl<S: Stamp, T> fmt::Debug for Captor<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captor")
            .field("stream", &self.stream)
            .field("policy", &self.policy_name)
            .field("locking", &self.locking)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<S: Stamp, T: Clone + Send> Captor<S, T> {
    pub fn builder(stream: impl Into<StreamId>) -> CaptorBuilder<S, T> {
        CaptorBuilder::new(stream)
    }

    /// Build from a config entry. Offsets in the config use the stamp's
    /// offset type.
    pub fn from_config(
        stream: impl Into<StreamId>,
        config: &CaptorConfig<S::Offset>,
    ) -> Result<Self, ContractError> {
        CaptorBuilder::from_config(stream, config)?.build()
    }

    /// Insert a dispatch.
    ///
    /// The overflow monitor runs after the lock is released.
    pub fn insert(&self, stamp: S, value: T) -> Insertion {
        let (admission, depth) = {
            let mut state = self.lock();
            let admission = state.queue.insert(Dispatch::new(stamp, value));
            (admission, state.queue.len())
        };

        metrics::gauge!("flow_queue_depth", "stream" => self.stream.to_string()).set(depth as f64);

        let insertion = admission.insertion();
        if let Some(dropped) = admission.overflowed() {
            debug!(
                stream = %self.stream,
                stamp = ?dropped.stamp,
                outcome = insertion.as_str(),
                "queue overflow"
            );
            metrics::counter!(
                "flow_dispatch_overflow_total",
                "stream" => self.stream.to_string(),
                "policy" => self.overflow.as_str()
            )
            .increment(1);

            if let Some(monitor) = &self.monitor {
                monitor(&self.stream, dropped);
            }
        }
        insertion
    }

    /// Capture under this captor's locking strategy.
    ///
    /// A driver writes its window into `range`; a follower reads it. Only a
    /// [`State::Primed`] outcome touches the queue or `output`.
    #[instrument(
        name = "captor_capture",
        level = "trace",
        skip(self, output, range),
        fields(stream = %self.stream, policy = self.policy_name)
    )]
    pub fn capture<O>(&self, output: &mut O, range: &mut CaptureRange<S>, deadline: Deadline) -> State
    where
        O: Extend<Dispatch<S, T>>,
    {
        let mut captured = Vec::new();
        let state = self.locking.run(deadline, || {
            let mut guard = self.lock();
            let located = guard.locate(range);
            if located.state == State::Primed {
                if let Some(window) = located.window {
                    *range = window;
                }
                captured = guard.extract(&located, range);
            }
            located.state
        });

        output.extend(captured);
        metrics::counter!(
            "flow_captures_total",
            "stream" => self.stream.to_string(),
            "state" => state.as_str()
        )
        .increment(1);
        state
    }

    /// Dry run: the state a capture would report right now. Nothing is
    /// removed; a driver still reports its window.
    pub fn locate(&self, range: &mut CaptureRange<S>) -> State {
        let located = self.lock().locate(range);
        if let Some(window) = located.window {
            *range = window;
        }
        located.state
    }

    /// Drop entries strictly before `t`. Returns how many were removed.
    pub fn remove(&self, t: S) -> usize {
        self.lock().remove_before(t)
    }

    /// Drop entries the policy can no longer use for windows from `t` on.
    pub fn abort(&self, t: S) {
        self.lock().abort(t);
    }

    /// Clear the queue and any state the policy carries between captures.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Oldest and newest queued stamps
    pub fn available_range(&self) -> Option<CaptureRange<S>> {
        let state = self.lock();
        match (state.queue.oldest_stamp(), state.queue.newest_stamp()) {
            (Some(lower), Some(upper)) => Some(CaptureRange::new(lower, upper)),
            _ => None,
        }
    }

    /// Read-only access to the queue under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&DispatchQueue<S, T>) -> R) -> R {
        f(&self.lock().queue)
    }

    pub fn stamps(&self) -> Vec<S> {
        self.inspect(|queue| queue.stamps().collect())
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn overflow_count(&self) -> u64 {
        self.lock().queue.overflow_count()
    }
}

impl<S: Stamp, T> Captor<S, T> {
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy_name
    }

    pub fn locking(&self) -> LockingStrategy {
        self.locking
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a live synchronizer currently owns this captor.
    pub fn is_enrolled(&self) -> bool {
        self.enrolled.load(Ordering::Acquire)
    }

    /// Claim the captor for one synchronizer. Fails if another holds it.
    pub(crate) fn enroll(&self) -> bool {
        self.enrolled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.enrolled.store(false, Ordering::Release);
    }

    /// Lock the captor state, recovering from poisoning. The queue is sorted
    /// between any two of its method calls.
    pub(crate) fn lock(&self) -> MutexGuard<'_, CaptorState<S, T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
