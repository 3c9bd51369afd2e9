use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// The most recent entry before the boundary, if there is one.
///
/// Never waits: an empty selection is still primed. Older entries are dropped.
#[derive(Debug, Clone, Copy)]
pub struct AnyBefore<S: Stamp> {
    delay: S::Offset,
}

impl<S: Stamp> AnyBefore<S> {
    pub fn new(delay: S::Offset) -> Self {
        Self { delay }
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for AnyBefore<S> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "any_before"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let n = queue.lower_bound(range.lower.retreat(self.delay));
        Located::primed(n.saturating_sub(1)..n, n)
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t.retreat(self.delay));
    }
}
