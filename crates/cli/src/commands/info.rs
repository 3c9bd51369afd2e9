//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LockingConfig, PipelineBlueprint, StreamConfig};

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Debug, Serialize)]
struct ConfigInfo {
    version: String,
    sync: SyncInfo,
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Serialize)]
struct SyncInfo {
    driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lower_bound: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StreamInfo {
    id: String,
    role: &'static str,
    policy: &'static str,
    capacity: usize,
    overflow: &'static str,
    locking: String,
    period: i64,
    phase: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    drop_every: Option<u32>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn describe_locking(locking: &LockingConfig) -> String {
    match locking {
        LockingConfig::NoWait => "no_wait".to_string(),
        LockingConfig::Polling { interval_ms } => format!("polling({interval_ms}ms)"),
    }
}

fn stream_info(stream: &StreamConfig) -> StreamInfo {
    StreamInfo {
        id: stream.id.to_string(),
        role: stream.role().as_str(),
        policy: stream.captor.policy.name(),
        capacity: stream.captor.capacity,
        overflow: stream.captor.overflow.as_str(),
        locking: describe_locking(&stream.captor.locking),
        period: stream.source.period,
        phase: stream.source.phase,
        drop_every: stream.source.drop_every,
    }
}

/// Driver first, followers in declared order (the capture output order)
fn build_config_info(blueprint: &PipelineBlueprint) -> ConfigInfo {
    let streams = blueprint
        .driver_stream()
        .into_iter()
        .chain(blueprint.follower_streams())
        .map(stream_info)
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sync: SyncInfo {
            driver: blueprint.sync.driver.to_string(),
            deadline_ms: blueprint.sync.deadline_ms,
            lower_bound: blueprint.sync.lower_bound,
        },
        streams,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               flow-sync Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Synchronizer");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Driver: {}", info.sync.driver);
    match info.sync.lower_bound {
        Some(bound) => println!("   ├─ Lower bound: {bound}"),
        None => println!("   ├─ Lower bound: none"),
    }
    match info.sync.deadline_ms {
        Some(ms) => println!("   └─ Capture deadline: {ms} ms"),
        None => println!("   └─ Capture deadline: none"),
    }

    println!("\n📡 Streams ({})", info.streams.len());
    for (i, stream) in info.streams.iter().enumerate() {
        let is_last = i == info.streams.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} [{}] {} ({}, {})",
            prefix, i, stream.id, stream.role, stream.policy
        );
        println!(
            "   {}  ├─ Queue: capacity {}, {}, {}",
            child_prefix, stream.capacity, stream.overflow, stream.locking
        );
        match stream.drop_every {
            Some(k) => println!(
                "   {}  └─ Source: every {} ticks from {}, drops every {}th",
                child_prefix, stream.period, stream.phase, k
            ),
            None => println!(
                "   {}  └─ Source: every {} ticks from {}",
                child_prefix, stream.period, stream.phase
            ),
        }
    }

    println!();
}
