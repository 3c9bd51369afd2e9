use contracts::{CaptureRange, ContractError, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// The `count` most recent entries before the boundary.
///
/// The selection and everything older is consumed, so a later window only
/// primes once `count` fresh entries precede it.
#[derive(Debug, Clone, Copy)]
pub struct CountBefore<S: Stamp> {
    count: usize,
    delay: S::Offset,
}

impl<S: Stamp> CountBefore<S> {
    pub fn new(count: usize, delay: S::Offset) -> Result<Self, ContractError> {
        if count == 0 {
            return Err(ContractError::config_validation(
                "policy.count",
                "count must be > 0",
            ));
        }
        Ok(Self { count, delay })
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for CountBefore<S> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "count_before"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let n = queue.lower_bound(range.lower.retreat(self.delay));
        if n >= self.count {
            let first = n - self.count;
            Located::primed(first..n, n)
        } else if n < queue.len() {
            // The stream is already past the boundary; the missing older
            // entries were evicted, consumed or never sent.
            Located::abort()
        } else {
            Located::retry()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::*;
    use contracts::{Dispatch, OverflowPolicy, State};

    #[test]
    fn test_count_before_retries_while_short() {
        let mut count = CountBefore::<i64>::new(3, 0).unwrap();
        let mut queue = queue_of(&[1, 2]);

        let (state, _, _) = capture(&mut count, &mut queue, CaptureRange::at(10));
        assert_eq!(state, State::Retry);

        queue.insert(Dispatch::new(3, 3));
        let (state, out, _) = capture(&mut count, &mut queue, CaptureRange::at(10));
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_count_before_consumes_selection() {
        let mut count = CountBefore::<i64>::new(2, 0).unwrap();
        let mut queue = queue_of(&[1, 2, 3, 4, 12]);

        let (state, out, _) = capture(&mut count, &mut queue, CaptureRange::at(10));
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![3, 4]);
        assert_eq!(stamps(&queue), vec![12]);
    }

    #[test]
    fn test_count_before_never_repeats_across_windows() {
        let mut count = CountBefore::<i64>::new(2, 0).unwrap();
        let mut queue = queue_of(&[3, 4, 11, 13]);

        let (state, out, _) = capture(&mut count, &mut queue, CaptureRange::at(10));
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![3, 4]);

        // Only 11 precedes 12 now and 13 shows nothing older can arrive
        let (state, out, _) = capture(&mut count, &mut queue, CaptureRange::at(12));
        assert_eq!(state, State::Abort);
        assert!(out.is_empty());
        assert_eq!(stamps(&queue), vec![11, 13]);
    }

    #[test]
    fn test_count_before_aborts_after_eviction() {
        let mut queue = crate::queue::DispatchQueue::new(3, OverflowPolicy::EvictOldest);
        for t in [1i64, 2, 11, 12] {
            queue.insert(Dispatch::new(t, t));
        }
        // 1 was evicted, only 2 precedes the boundary
        let mut count = CountBefore::<i64>::new(3, 0).unwrap();
        let (state, _, _) = capture(&mut count, &mut queue, CaptureRange::at(10));
        assert_eq!(state, State::Abort);
        assert_eq!(stamps(&queue), vec![2, 11, 12]);
    }

    #[test]
    fn test_count_before_zero_rejected() {
        assert!(CountBefore::<i64>::new(0, 0).is_err());
    }
}
