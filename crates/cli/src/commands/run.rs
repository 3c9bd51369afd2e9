//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};

use contracts::PipelineBlueprint;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{build_synchronizer, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    for warning in config_loader::ConfigLoader::warnings(&blueprint) {
        warn!("{warning}");
    }

    info!(
        driver = %blueprint.sync.driver,
        streams = blueprint.streams.len(),
        deadline_ms = ?blueprint.sync.deadline_ms,
        "Configuration loaded"
    );

    if args.dry_run {
        let sync = build_synchronizer(&blueprint).context("Failed to assemble synchronizer")?;
        info!(
            streams = sync.stream_count(),
            "Dry run mode - synchronizer assembled, exiting"
        );
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_captures: (args.max_captures > 0).then_some(args.max_captures),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        speed: args.speed,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });
    let shutdown = pipeline.shutdown_handle();

    info!("Starting pipeline...");

    let run = pipeline.run();
    tokio::pin!(run);

    // The capture loop runs on a blocking thread, so a signal only raises
    // the flag and the run is still awaited for its statistics.
    let finished = tokio::select! {
        result = &mut run => Some(result),
        _ = shutdown_signal() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            warn!("Received shutdown signal, stopping pipeline...");
            shutdown.store(true, Ordering::SeqCst);
            run.await
        }
    };

    let stats = result.context("Pipeline execution failed")?;
    info!(
        captures = stats.captures,
        produced = stats.produced,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.capture_rate()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("flow-sync finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &PipelineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Driver: {}", blueprint.sync.driver);
    if let Some(ms) = blueprint.sync.deadline_ms {
        println!("Capture deadline: {ms} ms");
    }
    if let Some(bound) = blueprint.sync.lower_bound {
        println!("Lower bound: {bound}");
    }

    println!("\nStreams ({}):", blueprint.streams.len());
    for stream in &blueprint.streams {
        println!(
            "  - {} [{}] {} (capacity {}, {})",
            stream.id,
            stream.role().as_str(),
            stream.captor.policy.name(),
            stream.captor.capacity,
            stream.captor.overflow.as_str()
        );
    }

    println!();
}
