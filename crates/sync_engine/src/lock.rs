//! Locking strategies for captor access.

use std::thread;
use std::time::Duration;

use contracts::{ContractError, Deadline, LockingConfig, State};

/// How a capture waits for its policy to become satisfied.
///
/// The strategy owns no lock itself; the check closure acquires the captor
/// lock, so the lock is never held across a poll sleep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockingStrategy {
    /// Check exactly once.
    #[default]
    NoWait,
    /// Re-check every `interval` until satisfied or the deadline passes.
    Polling { interval: Duration },
}

impl LockingStrategy {
    pub fn polling(interval: Duration) -> Result<Self, ContractError> {
        if interval.is_zero() {
            return Err(ContractError::config_validation(
                "locking.interval_ms",
                "poll interval must be > 0",
            ));
        }
        Ok(Self::Polling { interval })
    }

    pub fn from_config(config: &LockingConfig) -> Result<Self, ContractError> {
        match config {
            LockingConfig::NoWait => Ok(Self::NoWait),
            LockingConfig::Polling { interval_ms } => {
                Self::polling(Duration::from_millis(*interval_ms))
            }
        }
    }

    #[inline]
    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            Self::NoWait => None,
            Self::Polling { interval } => Some(*interval),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoWait => "no_wait",
            Self::Polling { .. } => "polling",
        }
    }

    /// Run `check` under this strategy.
    ///
    /// `check` is re-run only while it reports [`State::Retry`]. A polling
    /// strategy turns a retry past the deadline into [`State::Timeout`].
    pub fn run<F>(&self, deadline: Deadline, mut check: F) -> State
    where
        F: FnMut() -> State,
    {
        match self {
            Self::NoWait => check(),
            Self::Polling { interval } => loop {
                let state = check();
                if state != State::Retry {
                    return state;
                }
                if deadline.is_expired() {
                    return State::Timeout;
                }
                let nap = deadline.clamp(*interval);
                if !nap.is_zero() {
                    thread::sleep(nap);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_no_wait_checks_once() {
        let mut calls = 0;
        let state = LockingStrategy::NoWait.run(Deadline::never(), || {
            calls += 1;
            State::Retry
        });
        assert_eq!(state, State::Retry);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_polling_until_primed() {
        let strategy = LockingStrategy::polling(Duration::from_millis(1)).unwrap();
        let mut calls = 0;
        let state = strategy.run(Deadline::never(), || {
            calls += 1;
            if calls < 4 {
                State::Retry
            } else {
                State::Primed
            }
        });
        assert_eq!(state, State::Primed);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_polling_times_out() {
        let strategy = LockingStrategy::polling(Duration::from_millis(2)).unwrap();
        let start = Instant::now();
        let state = strategy.run(Deadline::after(Duration::from_millis(20)), || State::Retry);
        assert_eq!(state, State::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_polling_passes_abort_through() {
        let strategy = LockingStrategy::polling(Duration::from_millis(1)).unwrap();
        assert_eq!(strategy.run(Deadline::never(), || State::Abort), State::Abort);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(LockingStrategy::polling(Duration::ZERO).is_err());
        let config = LockingConfig::Polling { interval_ms: 0 };
        assert!(LockingStrategy::from_config(&config).is_err());
        assert_eq!(
            LockingStrategy::from_config(&LockingConfig::NoWait).unwrap(),
            LockingStrategy::NoWait
        );
    }
}
