//! Pipeline orchestration module.

mod orchestrator;
mod source;
mod stats;

pub use orchestrator::{build_synchronizer, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
