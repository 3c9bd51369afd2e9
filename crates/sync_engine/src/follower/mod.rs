//! Follower policies: select data from their own queue for a driver window.
//!
//! Most followers measure against a boundary `window.lower - delay`, so a
//! stream with a known latency can still be aligned.

mod any_before;
mod before;
mod closest_before;
mod count_before;
mod exact;
mod latched;
mod matched_stamp;
mod ranged;

pub use any_before::AnyBefore;
pub use before::Before;
pub use closest_before::ClosestBefore;
pub use count_before::CountBefore;
pub use exact::Exact;
pub use latched::Latched;
pub use matched_stamp::MatchedStamp;
pub use ranged::Ranged;
