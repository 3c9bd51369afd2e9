use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Everything strictly before the boundary.
///
/// Waits until the stream has reached the boundary, so no earlier entry can
/// still show up. The selection may be empty.
#[derive(Debug, Clone, Copy)]
pub struct Before<S: Stamp> {
    delay: S::Offset,
}

impl<S: Stamp> Before<S> {
    pub fn new(delay: S::Offset) -> Self {
        Self { delay }
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Before<S> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "before"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let boundary = range.lower.retreat(self.delay);
        match queue.newest_stamp() {
            Some(newest) if newest >= boundary => {
                let n = queue.lower_bound(boundary);
                Located::primed(0..n, n)
            }
            _ => Located::retry(),
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t.retreat(self.delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::*;
    use contracts::State;

    #[test]
    fn test_before_takes_all_older() {
        let mut before = Before::<i64>::new(0);
        let mut queue = queue_of(&[1, 2, 3, 6, 7]);

        let (state, out, _) = capture(&mut before, &mut queue, CaptureRange::new(5, 8));
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(stamps(&queue), vec![6, 7]);
    }

    #[test]
    fn test_before_retries_until_boundary_reached() {
        let mut before = Before::<i64>::new(0);
        let mut queue = queue_of(&[1, 2, 3]);

        let (state, _, _) = capture(&mut before, &mut queue, CaptureRange::at(5));
        assert_eq!(state, State::Retry);
        assert_eq!(stamps(&queue), vec![1, 2, 3]);

        let mut empty = queue_of(&[]);
        let (state, _, _) = capture(&mut before, &mut empty, CaptureRange::at(5));
        assert_eq!(state, State::Retry);
    }

    #[test]
    fn test_before_primed_with_nothing_older() {
        let mut before = Before::<i64>::new(0);
        let mut queue = queue_of(&[5, 9]);

        let (state, out, _) = capture(&mut before, &mut queue, CaptureRange::at(5));
        assert_eq!(state, State::Primed);
        assert!(out.is_empty());
        assert_eq!(stamps(&queue), vec![5, 9]);
    }

    #[test]
    fn test_before_with_delay() {
        let mut before = Before::<i64>::new(2);
        let mut queue = queue_of(&[1, 2, 3, 4]);

        let (state, out, _) = capture(&mut before, &mut queue, CaptureRange::at(5));
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![1, 2]);
        assert_eq!(stamps(&queue), vec![3, 4]);
    }
}
