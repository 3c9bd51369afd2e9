//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use observability::ObservabilityConfig;
use std::path::PathBuf;

/// flow-sync - replay mock streams through a synchronizer
#[derive(Parser, Debug)]
#[command(
    name = "flow-sync",
    author,
    version,
    about = "Multi-stream synchronization capture pipeline",
    long_about = "Builds one captor per configured stream and a synchronizer around them.\n\n\
                  Mock producers feed every stream at its configured period while the \n\
                  capture loop assembles synchronized sets from the driver's windows."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FLOW_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FLOW_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Tracing setup for the global flags. `RUST_LOG` still takes
    /// precedence; the Prometheus listener is left to `run`.
    pub fn observability(&self) -> ObservabilityConfig {
        let level = match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        ObservabilityConfig {
            log_format: self.log_format.into(),
            metrics_port: None,
            default_log_level: level.to_string(),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the synchronization pipeline against mock producers
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "pipeline.toml", env = "FLOW_SYNC_CONFIG")]
    pub config: PathBuf,

    /// Stop after this many primed captures (0 = unlimited)
    #[arg(long, default_value = "0", env = "FLOW_SYNC_MAX_CAPTURES")]
    pub max_captures: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FLOW_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Producer speed multiplier; one stamp tick lasts 1ms / speed
    #[arg(long, default_value = "1.0", env = "FLOW_SYNC_SPEED")]
    pub speed: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FLOW_SYNC_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration, assemble the synchronizer and exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pipeline.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "pipeline.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
