//! Synchronizer: one driver and N followers captured as a unit.
//!
//! Every attempt locks all members in declared order, asks the driver for a
//! window, checks every follower against it and only then extracts. Either
//! every queue gives up its selection or none does (a stale or unmatched
//! driver window is the one exception: it is dropped so the next call can
//! make progress).
//!
//! A captor belongs to at most one live synchronizer, so two synchronizers
//! never wait on each other's locks.

use std::sync::{Arc, MutexGuard};
use std::thread;
use std::time::Duration;

use contracts::{CaptureRange, CaptureResult, Deadline, Dispatch, Role, Stamp, State, StreamId};
use tracing::{debug, instrument, trace};

use crate::captor::{Captor, CaptorState};
use crate::error::{EngineError, Result};
use crate::policy::Located;

type Staged<S, T> = Vec<Vec<Dispatch<S, T>>>;

/// What one locked pass decided, before anything is extracted.
enum Plan<S> {
    /// The driver has no window yet.
    Idle,
    /// Stale or unsatisfiable window; only the driver gives it up.
    Discard {
        window: CaptureRange<S>,
        driver: Located<S>,
    },
    /// Some follower needs more data.
    Wait(CaptureRange<S>),
    /// Every stream is primed.
    Commit {
        window: CaptureRange<S>,
        driver: Located<S>,
        followers: Vec<Located<S>>,
    },
}

fn plan<S: Stamp, T: Clone>(
    guards: &[MutexGuard<'_, CaptorState<S, T>>],
    lower_bound: S,
) -> Plan<S> {
    let Some((driver, followers)) = guards.split_first() else {
        return Plan::Idle;
    };

    let located = driver.locate(&CaptureRange::default());
    let Some(window) = located.window.filter(|_| located.state == State::Primed) else {
        return Plan::Idle;
    };

    if window.upper < lower_bound {
        debug!(?window, ?lower_bound, "driver window below lower bound");
        return Plan::Discard {
            window,
            driver: located,
        };
    }

    let mut waiting = false;
    let mut follower_located = Vec::with_capacity(followers.len());
    for follower in followers {
        let found = follower.locate(&window);
        match found.state {
            State::Abort => {
                debug!(?window, "follower cannot satisfy window");
                return Plan::Discard {
                    window,
                    driver: located,
                };
            }
            State::Retry | State::Timeout => waiting = true,
            State::Primed => {}
        }
        follower_located.push(found);
    }

    if waiting {
        Plan::Wait(window)
    } else {
        Plan::Commit {
            window,
            driver: located,
            followers: follower_located,
        }
    }
}

/// Multi-stream capture orchestrator
pub struct Synchronizer<S: Stamp, T> {
    driver: Arc<Captor<S, T>>,
    followers: Vec<Arc<Captor<S, T>>>,
    /// Smallest poll interval of any member; `None` if all are no-wait
    poll_interval: Option<Duration>,
}

impl<S: Stamp, T> std::fmt::Debug for Synchronizer<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("driver", self.driver.stream())
            .field(
                "followers",
                &self.followers.iter().map(|c| c.stream()).collect::<Vec<_>>(),
            )
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl<S: Stamp, T> Drop for Synchronizer<S, T> {
    fn drop(&mut self) {
        for captor in std::iter::once(&self.driver).chain(self.followers.iter()) {
            captor.release();
        }
    }
}

impl<S: Stamp, T: Clone + Send> Synchronizer<S, T> {
    /// Assemble a synchronizer. Every captor is claimed until the
    /// synchronizer is dropped. Followers keep the given order, which is
    /// also the order of the output slots after the driver.
    pub fn new(driver: Arc<Captor<S, T>>, followers: Vec<Arc<Captor<S, T>>>) -> Result<Self> {
        if driver.role() != Role::Driver {
            return Err(EngineError::role_mismatch(
                driver.stream().as_str(),
                Role::Driver,
                driver.role(),
            ));
        }

        for (i, follower) in followers.iter().enumerate() {
            if follower.role() != Role::Follower {
                return Err(EngineError::role_mismatch(
                    follower.stream().as_str(),
                    Role::Follower,
                    follower.role(),
                ));
            }
            let seen = Arc::ptr_eq(follower, &driver)
                || followers[..i].iter().any(|other| Arc::ptr_eq(other, follower));
            if seen {
                return Err(EngineError::DuplicateCaptor {
                    stream: follower.stream().to_string(),
                });
            }
        }

        let members: Vec<&Arc<Captor<S, T>>> =
            std::iter::once(&driver).chain(followers.iter()).collect();
        for (i, captor) in members.iter().enumerate() {
            if !captor.enroll() {
                for claimed in &members[..i] {
                    claimed.release();
                }
                return Err(EngineError::CaptorInUse {
                    stream: captor.stream().to_string(),
                });
            }
        }

        let poll_interval = members
            .iter()
            .filter_map(|c| c.locking().poll_interval())
            .min();

        Ok(Self {
            driver,
            followers,
            poll_interval,
        })
    }

    pub fn driver(&self) -> &Arc<Captor<S, T>> {
        &self.driver
    }

    pub fn followers(&self) -> &[Arc<Captor<S, T>>] {
        &self.followers
    }

    /// Driver plus followers
    pub fn stream_count(&self) -> usize {
        1 + self.followers.len()
    }

    /// Stream ids in output order
    pub fn streams(&self) -> Vec<StreamId> {
        self.members().map(|c| c.stream().clone()).collect()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    /// Capture one synchronized set.
    ///
    /// `outputs[0]` receives the driver's dispatches and `outputs[i + 1]`
    /// those of follower `i`. A driver window whose upper bound is below
    /// `lower_bound` is dropped and reported as [`State::Abort`].
    #[instrument(
        name = "synchronizer_capture",
        level = "debug",
        skip(self, outputs),
        fields(driver = %self.driver.stream())
    )]
    pub fn capture<O>(
        &self,
        outputs: &mut [O],
        lower_bound: S,
        deadline: Deadline,
    ) -> Result<CaptureResult<S>>
    where
        O: Extend<Dispatch<S, T>>,
    {
        let expected = self.stream_count();
        if outputs.len() != expected {
            return Err(EngineError::OutputMismatch {
                expected,
                actual: outputs.len(),
            });
        }

        loop {
            let (result, staged) = self.attempt(lower_bound);

            let result = match (result.state, self.poll_interval) {
                (State::Retry, Some(interval)) => {
                    if !deadline.is_expired() {
                        trace!(?result.range, "waiting for followers");
                        thread::sleep(deadline.clamp(interval));
                        continue;
                    }
                    CaptureResult::new(State::Timeout, result.range)
                }
                _ => result,
            };

            for (output, batch) in outputs.iter_mut().zip(staged) {
                output.extend(batch);
            }

            metrics::counter!("flow_sync_total", "state" => result.state.as_str()).increment(1);
            debug!(state = %result.state, range = ?result.range, "capture finished");
            return Ok(result);
        }
    }

    /// Check every stream against the next driver window without touching
    /// any queue.
    ///
    /// Reports what [`Synchronizer::capture`] would do right now under a
    /// no-wait strategy: `Primed` means a capture would succeed, `Abort`
    /// that it would drop the driver window.
    #[instrument(
        name = "synchronizer_locate",
        level = "trace",
        skip(self),
        fields(driver = %self.driver.stream())
    )]
    pub fn locate(&self, lower_bound: S) -> CaptureResult<S> {
        let guards = self.lock_all();
        match plan(&guards, lower_bound) {
            Plan::Idle => CaptureResult::new(State::Retry, None),
            Plan::Discard { window, .. } => CaptureResult::new(State::Abort, Some(window)),
            Plan::Wait(window) => CaptureResult::new(State::Retry, Some(window)),
            Plan::Commit { window, .. } => CaptureResult::new(State::Primed, Some(window)),
        }
    }

    /// One locked pass over all members. Returns the staged outputs, which
    /// are non-empty only for a primed result.
    fn attempt(&self, lower_bound: S) -> (CaptureResult<S>, Staged<S, T>) {
        let mut guards = self.lock_all();
        let plan = plan(&guards, lower_bound);
        let Some((driver, followers)) = guards.split_first_mut() else {
            return (CaptureResult::new(State::Retry, None), Vec::new());
        };

        match plan {
            Plan::Idle => (CaptureResult::new(State::Retry, None), Vec::new()),
            Plan::Wait(window) => (CaptureResult::new(State::Retry, Some(window)), Vec::new()),
            Plan::Discard {
                window,
                driver: located,
            } => {
                debug!(?window, "driver window dropped");
                driver.extract(&located, &window);
                (CaptureResult::new(State::Abort, Some(window)), Vec::new())
            }
            Plan::Commit {
                window,
                driver: located,
                followers: follower_located,
            } => {
                let mut staged = Vec::with_capacity(1 + followers.len());
                staged.push(driver.extract(&located, &window));
                for (follower, found) in followers.iter_mut().zip(&follower_located) {
                    staged.push(follower.extract(found, &window));
                }
                (CaptureResult::new(State::Primed, Some(window)), staged)
            }
        }
    }

    fn lock_all(&self) -> Vec<MutexGuard<'_, CaptorState<S, T>>> {
        self.members().map(|c| c.lock()).collect()
    }

    /// Drop driver data strictly before `t`.
    pub fn remove(&self, t: S) -> usize {
        self.driver.remove(t)
    }

    /// Let every member prune what windows from `t` on cannot use.
    pub fn abort(&self, t: S) {
        for captor in self.members() {
            captor.abort(t);
        }
    }

    /// Clear every member's queue and policy state.
    pub fn reset(&self) {
        for captor in self.members() {
            captor.reset();
        }
    }

    /// Driver then followers, the order of `capture` outputs
    pub fn members(&self) -> impl Iterator<Item = &Arc<Captor<S, T>>> + '_ {
        std::iter::once(&self.driver).chain(self.followers.iter())
    }
}
