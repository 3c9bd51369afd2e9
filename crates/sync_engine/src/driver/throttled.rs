use contracts::{CaptureRange, Dispatch, Role, Stamp};

use crate::policy::{take, CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Like [`Next`](super::Next), but a window must start at least
/// `min_period` after the previously accepted one. Entries that arrive too
/// soon are dropped when the next window is accepted.
#[derive(Debug, Clone, Copy)]
pub struct Throttled<S: Stamp> {
    min_period: S::Offset,
    previous: Option<S>,
}

impl<S: Stamp> Throttled<S> {
    pub fn new(min_period: S::Offset) -> Self {
        Self {
            min_period,
            previous: None,
        }
    }

    /// Stamp of the last accepted window
    pub fn previous(&self) -> Option<S> {
        self.previous
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Throttled<S> {
    fn role(&self) -> Role {
        Role::Driver
    }

    fn name(&self) -> &'static str {
        "throttled"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, _range: &CaptureRange<S>) -> Located<S> {
        let k = match self.previous {
            None => 0,
            Some(prev) => queue.lower_bound(prev.advance(self.min_period)),
        };
        match queue.stamp_at(k) {
            Some(stamp) => Located::primed(k..k + 1, k + 1).with_window(CaptureRange::at(stamp)),
            None => Located::retry(),
        }
    }

    fn extract(
        &mut self,
        queue: &mut DispatchQueue<S, T>,
        located: &Located<S>,
        _range: &CaptureRange<S>,
    ) -> Vec<Dispatch<S, T>> {
        if let Some(window) = located.window {
            self.previous = Some(window.lower);
        }
        take(queue, located)
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}
