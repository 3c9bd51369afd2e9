//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace:
//! stamps, dispatches, capture outcomes and pipeline configuration.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - A stamp is any totally ordered key implementing [`Stamp`]
//! - Config files express stamps and offsets as `i64` ticks

mod blueprint;
mod captor_config;
mod capture;
mod error;
mod stamp;
mod stream_id;

pub use blueprint::*;
pub use captor_config::*;
pub use capture::*;
pub use error::*;
pub use stamp::Stamp;
pub use stream_id::StreamId;
