use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// The oldest entry inside the window.
///
/// Unlike [`Ranged`](super::Ranged) it does not wait for the window to
/// close; older entries are dropped with the selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Exact {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "exact"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let n = queue.lower_bound(range.lower);
        match queue.stamp_at(n) {
            Some(stamp) if stamp <= range.upper => Located::primed(n..n + 1, n + 1),
            Some(_) => Located::abort(),
            None => Located::retry(),
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }
}
