//! Pipeline orchestrator - coordinates producers and the capture loop.
//!
//! Every stream gets a captor built from its config entry and a mock
//! producer task. The synchronizer runs on a blocking thread because a
//! polling capture sleeps between attempts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{ContractError, Dispatch, PipelineBlueprint, StreamConfig};
use sync_engine::{CaptorBuilder, Deadline, State, Synchronizer};
use tracing::{debug, info, trace, warn};

use super::source::MockSource;
use super::PipelineStats;
use crate::error::CliError;

/// Deadline per capture call when the blueprint sets none, so the loop
/// can observe shutdown.
const CAPTURE_SLICE: Duration = Duration::from_millis(100);

/// Pause after a RETRY from an all-no-wait synchronizer.
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: PipelineBlueprint,

    /// Stop after this many primed captures (None = unlimited)
    pub max_captures: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Producer speed multiplier; one stamp tick lasts 1ms / speed
    pub speed: f64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Build every captor of the blueprint and assemble the synchronizer.
///
/// Outputs follow the driver first, then followers in declared order.
pub fn build_synchronizer(
    blueprint: &PipelineBlueprint,
) -> Result<Synchronizer<i64, Bytes>, CliError> {
    let driver = blueprint
        .driver_stream()
        .ok_or_else(|| ContractError::unknown_stream(blueprint.sync.driver.as_str()))?;

    let driver = Arc::new(build_captor(driver)?);
    let followers = blueprint
        .follower_streams()
        .map(|stream| build_captor(stream).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Synchronizer::new(driver, followers)?)
}

fn build_captor(stream: &StreamConfig) -> Result<sync_engine::Captor<i64, Bytes>, CliError> {
    let captor = CaptorBuilder::from_config(stream.id.clone(), &stream.captor)?
        .monitor(|stream, dropped: &Dispatch<i64, Bytes>| {
            warn!(stream = %stream, stamp = dropped.stamp, "Dispatch dropped on overflow");
            observability::record_overflow(stream);
        })
        .build()?;
    Ok(captor)
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    shutdown: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops producers and the capture loop once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let speed = self.config.speed;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CliError::invalid_option("speed", format!("must be > 0, got {speed}")).into());
        }

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let blueprint = &self.config.blueprint;
        let sync = Arc::new(build_synchronizer(blueprint)?);
        info!(
            driver = %sync.driver().stream(),
            followers = sync.followers().len(),
            poll_interval = ?sync.poll_interval(),
            "Synchronizer assembled"
        );

        // Start Producers
        let tick = Duration::from_secs_f64(1e-3 / speed);
        let produced = Arc::new(AtomicU64::new(0));
        let configs = blueprint
            .driver_stream()
            .into_iter()
            .chain(blueprint.follower_streams());
        let captors = sync.members();

        let producers: Vec<_> = configs
            .zip(captors)
            .map(|(config, captor)| {
                let source = MockSource::new(config.source.clone(), Arc::clone(captor), tick);
                tokio::spawn(source.run(Arc::clone(&self.shutdown), Arc::clone(&produced)))
            })
            .collect();

        info!(
            producers = producers.len(),
            max_captures = ?self.config.max_captures,
            "Pipeline running"
        );

        // Capture Loop
        let settings = LoopSettings {
            slice: blueprint.sync.deadline().unwrap_or(CAPTURE_SLICE),
            lower_bound: blueprint.sync.lower_bound.unwrap_or(i64::MIN),
            max_captures: self.config.max_captures,
            timeout: self.config.timeout,
        };
        let loop_sync = Arc::clone(&sync);
        let loop_shutdown = Arc::clone(&self.shutdown);
        let outcome =
            tokio::task::spawn_blocking(move || capture_loop(&loop_sync, &loop_shutdown, settings))
                .await;

        // Shutdown
        info!("Shutting down pipeline...");
        self.shutdown.store(true, Ordering::SeqCst);
        for producer in producers {
            if let Err(e) = producer.await {
                warn!(error = %e, "Producer task failed");
            }
        }

        let mut stats = outcome
            .map_err(|e| CliError::task(e.to_string()))
            .context("Capture loop did not complete")??;

        for captor in sync.members() {
            let overflowed = captor.overflow_count();
            if overflowed > 0 {
                stats
                    .metrics
                    .overflow_per_stream
                    .insert(captor.stream().to_string(), overflowed);
            }
        }
        stats.produced = produced.load(Ordering::Relaxed);
        stats.streams = sync.stream_count();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            captures = stats.captures,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy)]
struct LoopSettings {
    slice: Duration,
    lower_bound: i64,
    max_captures: Option<u64>,
    timeout: Option<Duration>,
}

fn capture_loop(
    sync: &Synchronizer<i64, Bytes>,
    shutdown: &AtomicBool,
    settings: LoopSettings,
) -> Result<PipelineStats, CliError> {
    let started = Instant::now();
    let streams = sync.streams();
    let mut outputs: Vec<Vec<Dispatch<i64, Bytes>>> = vec![Vec::new(); sync.stream_count()];
    let mut stats = PipelineStats::default();

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, leaving capture loop");
            break;
        }
        if let Some(limit) = settings.timeout {
            if started.elapsed() >= limit {
                warn!(timeout_secs = limit.as_secs(), "Pipeline timed out");
                break;
            }
        }

        outputs.iter_mut().for_each(Vec::clear);
        let attempt = Instant::now();
        let result = sync.capture(
            &mut outputs,
            settings.lower_bound,
            Deadline::after(settings.slice),
        )?;
        let latency_ms = attempt.elapsed().as_secs_f64() * 1000.0;

        observability::record_capture_outcome(result.state, latency_ms);
        let span = result
            .range
            .map(|range| range.upper.saturating_sub(range.lower) as f64);
        stats.metrics.record(result.state, latency_ms, span);

        match result.state {
            State::Primed => {
                stats.captures += 1;
                for (stream, output) in streams.iter().zip(&outputs) {
                    stats.metrics.record_captured(stream, output.len());
                }
                for captor in sync.members() {
                    observability::record_queue_depth(captor.stream(), captor.len());
                }
                debug!(
                    range = ?result.range,
                    sizes = ?outputs.iter().map(Vec::len).collect::<Vec<_>>(),
                    "Synchronized set captured"
                );

                if let Some(max) = settings.max_captures {
                    if stats.captures >= max {
                        info!(captures = stats.captures, "Reached max captures limit");
                        break;
                    }
                }
            }
            State::Retry => std::thread::sleep(IDLE_BACKOFF),
            State::Abort => debug!(range = ?result.range, "Driver window dropped"),
            State::Timeout => trace!("Capture deadline elapsed"),
        }
    }

    Ok(stats)
}
