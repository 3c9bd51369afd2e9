//! Capture vocabulary shared by captors and the synchronizer
//!
//! Dispatch, window, outcome states and the absolute deadline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::Stamp;

/// One stamped payload. The engine never looks inside `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch<S, T> {
    pub stamp: S,
    pub value: T,
}

impl<S, T> Dispatch<S, T> {
    #[inline]
    pub fn new(stamp: S, value: T) -> Self {
        Self { stamp, value }
    }
}

/// Stamp window proposed by a driver and consumed by followers.
///
/// Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRange<S> {
    pub lower: S,
    pub upper: S,
}

impl<S: Stamp> CaptureRange<S> {
    pub fn new(lower: S, upper: S) -> Self {
        Self { lower, upper }
    }

    /// Single-stamp window `[stamp, stamp]`.
    pub fn at(stamp: S) -> Self {
        Self {
            lower: stamp,
            upper: stamp,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lower <= self.upper
    }

    #[inline]
    pub fn contains(&self, stamp: S) -> bool {
        self.lower <= stamp && stamp <= self.upper
    }
}

impl<S: Stamp> Default for CaptureRange<S> {
    fn default() -> Self {
        Self::at(S::MIN)
    }
}

/// Outcome of one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Window satisfied; data was moved to the output.
    Primed,
    /// Not satisfiable yet; nothing changed.
    Retry,
    /// Can never be satisfied with the retained data.
    Abort,
    /// Deadline passed while retrying; nothing changed.
    Timeout,
}

impl State {
    pub const ALL: [State; 4] = [State::Primed, State::Retry, State::Abort, State::Timeout];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Primed => "primed",
            State::Retry => "retry",
            State::Abort => "abort",
            State::Timeout => "timeout",
        }
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        matches!(self, State::Primed)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a synchronized capture.
///
/// `range` is the driver window the attempt worked on, if the driver
/// produced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureResult<S> {
    pub state: State,
    pub range: Option<CaptureRange<S>>,
}

impl<S> CaptureResult<S> {
    pub fn new(state: State, range: Option<CaptureRange<S>>) -> Self {
        Self { state, range }
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.state.is_primed()
    }
}

/// Outcome of inserting into a bounded queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insertion {
    Accepted,
    /// Accepted after dropping the oldest queued dispatch.
    EvictedOldest,
    /// Not stored: capacity reached, or the stamp is already queued.
    Rejected,
}

impl Insertion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Insertion::Accepted => "accepted",
            Insertion::EvictedOldest => "evicted_oldest",
            Insertion::Rejected => "rejected",
        }
    }

    #[inline]
    pub fn is_stored(&self) -> bool {
        !matches!(self, Insertion::Rejected)
    }
}

/// Absolute point in time after which a capture gives up.
///
/// `Deadline::never()` waits forever; `Default` is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub const fn never() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Deadline `timeout` from now. Overflowing instants are treated as never.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` for a deadline that never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Shorten a sleep so it never overshoots the deadline.
    pub fn clamp(&self, interval: Duration) -> Duration {
        match self.remaining() {
            Some(left) => interval.min(left),
            None => interval,
        }
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self::at(instant)
    }
}
