//! # flow-sync CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 模拟数据源与捕获循环的编排
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init_with_config(cli.observability())?;
    info!(version = env!("CARGO_PKG_VERSION"), "flow-sync starting");

    let outcome = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };
    if let Err(e) = &outcome {
        error!(error = %e, "flow-sync command failed");
    }
    outcome
}
