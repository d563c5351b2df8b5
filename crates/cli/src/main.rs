//! # RFdc MTS CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 标定配置加载与验证
//! - 多 tile 同步标定（模拟设备）
//! - MTS 状态码解码

mod calibration;
mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_calibration, run_decode, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging (and metrics exporter if requested)
    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: cli.metrics_port(),
        default_log_level: cli.log_level().to_string(),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "RFdc MTS CLI starting");

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_calibration(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Decode(args) => run_decode(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
