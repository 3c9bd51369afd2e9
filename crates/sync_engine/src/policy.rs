//! Capture policy contract and the closed set of policy variants.
//!
//! A capture runs in two phases. `locate` inspects the queue without
//! touching it and reports what a capture would take. `extract` applies a
//! primed location: the selected entries go to the output and the obsolete
//! prefix is dropped. Keeping the phases apart lets the synchronizer check
//! every stream before any of them is mutated.

use std::ops::Range;

use contracts::{CaptureRange, ContractError, Dispatch, PolicyConfig, Role, Stamp, State};

use crate::driver::{Batch, Chunk, Next, Throttled};
use crate::follower::{
    AnyBefore, Before, ClosestBefore, CountBefore, Exact, Latched, MatchedStamp, Ranged,
};
use crate::queue::DispatchQueue;

/// Result of the `locate` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<S> {
    pub state: State,
    /// Queue positions handed to the output on extract.
    pub select: Range<usize>,
    /// Number of front entries removed on extract.
    pub consume: usize,
    /// Window proposed by a driver.
    pub window: Option<CaptureRange<S>>,
}

impl<S> Located<S> {
    pub fn retry() -> Self {
        Self::pending(State::Retry)
    }

    pub fn abort() -> Self {
        Self::pending(State::Abort)
    }

    fn pending(state: State) -> Self {
        Self {
            state,
            select: 0..0,
            consume: 0,
            window: None,
        }
    }

    pub fn primed(select: Range<usize>, consume: usize) -> Self {
        Self {
            state: State::Primed,
            select,
            consume,
            window: None,
        }
    }

    pub fn with_window(mut self, window: CaptureRange<S>) -> Self {
        self.window = Some(window);
        self
    }
}

/// Shared contract of every driver and follower policy.
pub trait CapturePolicy<S: Stamp, T: Clone> {
    fn role(&self) -> Role;

    fn name(&self) -> &'static str;

    /// Decide what a capture against `range` would take. Must not mutate.
    ///
    /// Drivers ignore `range` and report their window in [`Located::window`].
    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S>;

    /// Apply a primed location and return the captured dispatches.
    fn extract(
        &mut self,
        queue: &mut DispatchQueue<S, T>,
        located: &Located<S>,
        _range: &CaptureRange<S>,
    ) -> Vec<Dispatch<S, T>> {
        take(queue, located)
    }

    /// Drop entries no window at or after `t` can use.
    fn abort(&mut self, _queue: &mut DispatchQueue<S, T>, _t: S) {}

    /// Forget state carried between captures.
    fn reset(&mut self) {}
}

/// Move consumed selections out of the queue and clone the ones that stay.
pub(crate) fn take<S: Stamp, T: Clone>(
    queue: &mut DispatchQueue<S, T>,
    located: &Located<S>,
) -> Vec<Dispatch<S, T>> {
    let select = &located.select;
    let retained_from = select.start.max(located.consume);
    let retained: Vec<_> = (retained_from..select.end)
        .filter_map(|i| queue.get(i).cloned())
        .collect();

    let mut out: Vec<_> = queue
        .remove_first_n(located.consume)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| select.contains(i))
        .map(|(_, d)| d)
        .collect();
    out.extend(retained);
    out
}

/// Policy chosen at captor construction.
#[derive(Debug, Clone)]
pub enum Policy<S: Stamp, T> {
    Next(Next),
    Batch(Batch),
    Chunk(Chunk<S>),
    Throttled(Throttled<S>),
    Before(Before<S>),
    AnyBefore(AnyBefore<S>),
    ClosestBefore(ClosestBefore<S>),
    CountBefore(CountBefore<S>),
    Latched(Latched<S, T>),
    MatchedStamp(MatchedStamp),
    Exact(Exact),
    Ranged(Ranged<S>),
}

macro_rules! delegate {
    ($self:ident, $p:ident => $call:expr) => {
        match $self {
            Policy::Next($p) => $call,
            Policy::Batch($p) => $call,
            Policy::Chunk($p) => $call,
            Policy::Throttled($p) => $call,
            Policy::Before($p) => $call,
            Policy::AnyBefore($p) => $call,
            Policy::ClosestBefore($p) => $call,
            Policy::CountBefore($p) => $call,
            Policy::Latched($p) => $call,
            Policy::MatchedStamp($p) => $call,
            Policy::Exact($p) => $call,
            Policy::Ranged($p) => $call,
        }
    };
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Policy<S, T> {
    fn role(&self) -> Role {
        delegate!(self, p => CapturePolicy::<S, T>::role(p))
    }

    fn name(&self) -> &'static str {
        delegate!(self, p => CapturePolicy::<S, T>::name(p))
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        delegate!(self, p => p.locate(queue, range))
    }

    fn extract(
        &mut self,
        queue: &mut DispatchQueue<S, T>,
        located: &Located<S>,
        range: &CaptureRange<S>,
    ) -> Vec<Dispatch<S, T>> {
        delegate!(self, p => p.extract(queue, located, range))
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        delegate!(self, p => p.abort(queue, t))
    }

    fn reset(&mut self) {
        delegate!(self, p => CapturePolicy::<S, T>::reset(p))
    }
}

impl<S: Stamp, T: Clone> Policy<S, T> {
    /// Build a policy from its config, rejecting parameters that would
    /// make it retry forever.
    pub fn from_config(config: &PolicyConfig<S::Offset>) -> Result<Self, ContractError> {
        let zero = S::Offset::default();
        let non_negative = |field: &str, value: S::Offset| {
            if value < zero {
                Err(ContractError::config_validation(
                    field,
                    format!("{value:?} must not be negative"),
                ))
            } else {
                Ok(value)
            }
        };

        let policy = match *config {
            PolicyConfig::Next => Policy::Next(Next),
            PolicyConfig::Batch { size } => Policy::Batch(Batch::new(size)?),
            PolicyConfig::Chunk { duration } => Policy::Chunk(Chunk::new(duration)?),
            PolicyConfig::Throttled { min_period } => {
                Policy::Throttled(Throttled::new(non_negative("policy.min_period", min_period)?))
            }
            PolicyConfig::Before { delay } => {
                Policy::Before(Before::new(non_negative("policy.delay", delay)?))
            }
            PolicyConfig::AnyBefore { delay } => {
                Policy::AnyBefore(AnyBefore::new(non_negative("policy.delay", delay)?))
            }
            PolicyConfig::ClosestBefore { period, delay } => Policy::ClosestBefore(ClosestBefore::new(
                non_negative("policy.period", period)?,
                non_negative("policy.delay", delay)?,
            )),
            PolicyConfig::CountBefore { count, delay } => Policy::CountBefore(CountBefore::new(
                count,
                non_negative("policy.delay", delay)?,
            )?),
            PolicyConfig::Latched { min_period } => {
                Policy::Latched(Latched::new(non_negative("policy.min_period", min_period)?))
            }
            PolicyConfig::MatchedStamp { anchor } => Policy::MatchedStamp(MatchedStamp::new(anchor)),
            PolicyConfig::Exact => Policy::Exact(Exact),
            PolicyConfig::Ranged { delay } => {
                Policy::Ranged(Ranged::new(non_negative("policy.delay", delay)?))
            }
        };
        Ok(policy)
    }
}

macro_rules! impl_from_policy {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl<S: Stamp, T> From<$ty> for Policy<S, T> {
                fn from(policy: $ty) -> Self {
                    Policy::$variant(policy)
                }
            }
        )*
    };
}

impl_from_policy!(
    Next(Next),
    Batch(Batch),
    Chunk(Chunk<S>),
    Throttled(Throttled<S>),
    Before(Before<S>),
    AnyBefore(AnyBefore<S>),
    ClosestBefore(ClosestBefore<S>),
    CountBefore(CountBefore<S>),
    Latched(Latched<S, T>),
    MatchedStamp(MatchedStamp),
    Exact(Exact),
    Ranged(Ranged<S>),
);


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use contracts::MatchAnchor;

    #[test]
    fn test_take_moves_consumed_and_clones_retained() {
        let mut queue = queue_of(&[1, 2, 3, 4]);
        let located = Located::<i64>::primed(1..3, 2);

        let out: Vec<i64> = take(&mut queue, &located).into_iter().map(|d| d.stamp).collect();
        assert_eq!(out, vec![2, 3]);
        assert_eq!(stamps(&queue), vec![3, 4]);
    }

    #[test]
    fn test_from_config_roles() {
        let driver: Policy<i64, i64> = Policy::from_config(&PolicyConfig::Batch { size: 2 }).unwrap();
        assert_eq!(driver.role(), Role::Driver);
        assert_eq!(driver.name(), "batch");

        let follower: Policy<i64, i64> = Policy::from_config(&PolicyConfig::MatchedStamp {
            anchor: MatchAnchor::Upper,
        })
        .unwrap();
        assert_eq!(follower.role(), Role::Follower);
        assert_eq!(follower.name(), "matched_stamp");
    }

    #[test]
    fn test_from_config_rejects_degenerate_parameters() {
        let cases: [PolicyConfig<i64>; 5] = [
            PolicyConfig::Batch { size: 0 },
            PolicyConfig::CountBefore { count: 0, delay: 0 },
            PolicyConfig::Chunk { duration: 0 },
            PolicyConfig::Before { delay: -1 },
            PolicyConfig::ClosestBefore { period: -5, delay: 0 },
        ];
        for config in cases {
            let err = Policy::<i64, i64>::from_config(&config).unwrap_err();
            assert!(
                matches!(err, ContractError::ConfigValidation { .. }),
                "{config:?} -> {err}"
            );
        }
    }
}
