use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Everything inside `[lower - delay, upper - delay]`.
///
/// Primed only once an entry past the range shows the range is complete.
#[derive(Debug, Clone, Copy)]
pub struct Ranged<S: Stamp> {
    delay: S::Offset,
}

impl<S: Stamp> Ranged<S> {
    pub fn new(delay: S::Offset) -> Self {
        Self { delay }
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Ranged<S> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "ranged"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let lower = range.lower.retreat(self.delay);
        let upper = range.upper.retreat(self.delay);

        let (Some(oldest), Some(newest)) = (queue.oldest_stamp(), queue.newest_stamp()) else {
            return Located::retry();
        };
        if oldest > upper {
            return Located::abort();
        }
        if newest <= upper {
            return Located::retry();
        }

        let start = queue.lower_bound(lower);
        let end = queue.upper_bound(upper);
        if start == end {
            return Located::retry();
        }
        Located::primed(start..end, end)
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t.retreat(self.delay));
    }
}
