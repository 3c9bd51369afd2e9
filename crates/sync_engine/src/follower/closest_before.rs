use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// The entry nearest below the boundary, no further than `period` from it.
///
/// Aborts once the stream has passed the boundary without such an entry.
#[derive(Debug, Clone, Copy)]
pub struct ClosestBefore<S: Stamp> {
    period: S::Offset,
    delay: S::Offset,
}

impl<S: Stamp> ClosestBefore<S> {
    pub fn new(period: S::Offset, delay: S::Offset) -> Self {
        Self { period, delay }
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for ClosestBefore<S> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "closest_before"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let boundary = range.lower.retreat(self.delay);
        let n = queue.lower_bound(boundary);

        let candidate = n.checked_sub(1).and_then(|i| queue.stamp_at(i));
        if let Some(stamp) = candidate {
            if boundary.distance(stamp) <= self.period {
                return Located::primed(n - 1..n, n);
            }
        }

        if n < queue.len() {
            Located::abort()
        } else {
            Located::retry()
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t.retreat(self.delay).retreat(self.period));
    }
}
