//! Pipeline statistics.

use std::time::Duration;

use observability::CaptureMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Primed synchronizer captures
    pub captures: u64,

    /// Samples handed to captors by the producers
    pub produced: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of synchronized streams (driver included)
    pub streams: usize,

    /// Capture outcome aggregator
    pub metrics: CaptureMetricsAggregator,
}

impl PipelineStats {
    /// Primed captures per second
    pub fn capture_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.captures as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Streams: {}", self.streams);
        println!("   ├─ Samples produced: {}", self.produced);
        println!("   ├─ Primed captures: {}", self.captures);
        println!("   └─ Capture rate: {:.2}/s", self.capture_rate());

        println!("\n{}", self.metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_rate() {
        let stats = PipelineStats {
            captures: 50,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.capture_rate() - 25.0).abs() < 1e-10);
        assert_eq!(PipelineStats::default().capture_rate(), 0.0);
    }
}
