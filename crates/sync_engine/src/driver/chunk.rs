use contracts::{CaptureRange, ContractError, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Window is `[oldest, oldest + duration)`.
///
/// The chunk is closed once something at or after its end is queued. The
/// reported upper bound is the last stamp before the end, so followers see
/// the whole span even where the driver stream has gaps.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<S: Stamp> {
    duration: S::Offset,
}

impl<S: Stamp> Chunk<S> {
    pub fn new(duration: S::Offset) -> Result<Self, ContractError> {
        if duration <= S::Offset::default() {
            return Err(ContractError::config_validation(
                "policy.duration",
                "chunk duration must be > 0",
            ));
        }
        Ok(Self { duration })
    }

    pub fn duration(&self) -> S::Offset {
        self.duration
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Chunk<S> {
    fn role(&self) -> Role {
        Role::Driver
    }

    fn name(&self) -> &'static str {
        "chunk"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, _range: &CaptureRange<S>) -> Located<S> {
        let (Some(oldest), Some(newest)) = (queue.oldest_stamp(), queue.newest_stamp()) else {
            return Located::retry();
        };
        let end = oldest.advance(self.duration);
        if newest < end {
            return Located::retry();
        }

        let n = queue.lower_bound(end);
        if n == 0 {
            return Located::retry();
        }
        Located::primed(0..n, n).with_window(CaptureRange::new(oldest, end.predecessor()))
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }
}
