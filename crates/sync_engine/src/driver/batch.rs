use contracts::{CaptureRange, ContractError, Role, Stamp};

use crate::policy::{CapturePolicy, Located};
use crate::queue::DispatchQueue;

/// Window spans the `size` oldest dispatches; consumes all of them.
#[derive(Debug, Clone, Copy)]
pub struct Batch {
    size: usize,
}

impl Batch {
    pub fn new(size: usize) -> Result<Self, ContractError> {
        if size == 0 {
            return Err(ContractError::config_validation(
                "policy.size",
                "batch size must be > 0",
            ));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl<S: Stamp, T: Clone> CapturePolicy<S, T> for Batch {
    fn role(&self) -> Role {
        Role::Driver
    }

    fn name(&self) -> &'static str {
        "batch"
    }

    fn locate(&self, queue: &DispatchQueue<S, T>, _range: &CaptureRange<S>) -> Located<S> {
        match (queue.stamp_at(0), queue.stamp_at(self.size - 1)) {
            (Some(lower), Some(upper)) => {
                Located::primed(0..self.size, self.size).with_window(CaptureRange::new(lower, upper))
            }
            _ => Located::retry(),
        }
    }

    fn abort(&mut self, queue: &mut DispatchQueue<S, T>, t: S) {
        queue.remove_before(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::*;
    use contracts::State;

    #[test]
    fn test_batch_waits_for_size() {
        let mut batch = Batch::new(3).unwrap();
        let mut queue = queue_of(&[1, 2]);

        let (state, _, _) = capture(&mut batch, &mut queue, CaptureRange::default());
        assert_eq!(state, State::Retry);
        assert_eq!(stamps(&queue), vec![1, 2]);
    }

    #[test]
    fn test_batch_window_and_consumption() {
        let mut batch = Batch::new(2).unwrap();
        let mut queue = queue_of(&[5, 10, 15]);

        let (state, out, window) = capture(&mut batch, &mut queue, CaptureRange::default());
        assert_eq!(state, State::Primed);
        assert_eq!(out, vec![5, 10]);
        assert_eq!(window, Some(CaptureRange::new(5, 10)));
        assert_eq!(stamps(&queue), vec![15]);
    }

    #[test]
    fn test_batch_zero_rejected() {
        assert!(Batch::new(0).is_err());
    }
}
