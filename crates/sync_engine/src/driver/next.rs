use contracts::{CaptureRange, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Window is the oldest queued stamp; consumes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Next;

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Next {
    fn role(&self) -> Role {
        Role::Driver
    }

    fn name(&self) -> &'static str {
        "next"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, _range: &CaptureRange<S>) -> Located<S> {
        match queue.oldest_stamp() {
            Some(oldest) => Located::primed(0..1, 1).with_window(CaptureRange::at(oldest)),
            None => Located::retry(),
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }
}
