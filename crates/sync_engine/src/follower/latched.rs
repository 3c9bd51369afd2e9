use contracts::{CaptureRange, Dispatch, Role, Stamp};

use crate::policy::{take, CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Latches the newest entry at least `min_period` before the window and
/// re-emits it until a newer qualifying entry arrives.
///
/// The latched entry stays queued; everything older is dropped.
#[derive(Debug, Clone)]
pub struct Latched<S: Stamp, T> {
    min_period: S::Offset,
    latched: Option<Dispatch<S, T>>,
}

impl<S: Stamp, T> Latched<S, T> {
    pub fn new(min_period: S::Offset) -> Self {
        Self {
            min_period,
            latched: None,
        }
    }

    pub fn latched(&self) -> Option<&Dispatch<S, T>> {
        self.latched.as_ref()
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Latched<S, T> {
    fn role(&self) -> Role {
        Role::Follower
    }

    fn name(&self) -> &'static str {
        "latched"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, range: &CaptureRange<S>) -> Located<S> {
        let boundary = range.lower.retreat(self.min_period);
        let qualifying = queue.upper_bound(boundary);

        match (qualifying.checked_sub(1), &self.latched) {
            (Some(k), _) => Located::primed(k..k + 1, k),
            (None, Some(_)) => Located::primed(0..0, 0),
            (None, None) if queue.is_empty() => Located::retry(),
            (None, None) => Located::abort(),
        }
    }

    fn extract(
        &mut self,
        queue: &mut DispatchQueue<S, T>,
        located: &Located<S>,
        _range: &CaptureRange<S>,
    ) -> Vec<Dispatch<S, T>> {
        let out = take(queue, located);
        match out.last() {
            Some(newest) => {
                self.latched = Some(newest.clone());
                out
            }
            None => self.latched.iter().cloned().collect(),
        }
    }

    fn reset(&mut self) {
        self.latched = None;
    }
}
