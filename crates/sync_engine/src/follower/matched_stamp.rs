use contracts::{CaptureRange, MatchAnchor, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Requires an entry stamped exactly at the window anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchedStamp {
    anchor: MatchAnchor,
}

impl MatchedStamp {
    pub fn new(anchor: MatchAnchor) -> Self {
        Self { anchor }
    }

    fn anchor_of<S: Stamp>(&self, range: &CaptureRange<S>) -> S {
        match self.anchor {
            MatchAnchor::Lower => range.lower,
            MatchAnchor::Upper => range.upper,
        }
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for MatchedStamp {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "matched_stamp"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let anchor = self.anchor_of(range);
        let n = queue.lower_bound(anchor);
        match queue.stamp_at(n) {
            Some(stamp) if stamp == anchor => Located::primed(n..n + 1, n + 1),
            // anchor already passed
            Some(_) => Located::abort(),
            None => Located::retry(),
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }
}
