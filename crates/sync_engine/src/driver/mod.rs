//! Driver policies: propose a window from their own queue.
//!
//! Drivers never abort. They either produce a window or ask to retry.

mod batch;
mod chunk;
mod next;
mod throttled;

pub use batch::Batch;
pub use chunk::Chunk;
pub use next::Next;
pub use throttled::Throttled;
