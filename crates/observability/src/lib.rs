//! # Observability
//!
//! MTS 标定的日志与指标：Tracing 订阅器 + 可选的 Prometheus 导出。
//!
//! 每个 sync pass 的状态、逐 tile latency 和目标 latency 通过 [`metrics`]
//! 中的 `record_*` 函数上报；导出器未安装时这些调用是空操作。
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9100),
//!     default_log_level: "debug".into(),
//! })?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_auto_run_ms, record_sync_outcome, record_target_latency, record_tile_latency,
    CalibrationMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// 标定进程的日志/指标配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 监听端口，None 表示不导出（板上单次标定的常见情况）
    pub metrics_port: Option<u16>,
    /// `RUST_LOG` 未设置时使用的过滤级别
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// 结构化 JSON，带 tile/converter 字段，便于离线分析标定日志
    #[default]
    Json,
    Pretty,
    /// 单行，适合串口终端
    Compact,
}

/// 安装全局 tracing 订阅器，按需启动 Prometheus 导出
///
/// 只能调用一次；重复安装订阅器会返回错误。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    // 三种格式的 layer 类型不同，用 Option 组合，只有一个为 Some
    let format = config.log_format;
    let json = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
    });
    let pretty = (format == LogFormat::Pretty).then(|| fmt::layer().pretty());
    let compact = (format == LogFormat::Compact).then(|| fmt::layer().compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(compact)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Calibration logging ready"
    );
    Ok(())
}

fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to start MTS metrics exporter on port {port}"))?;
    tracing::info!(port, "MTS metrics exporter listening");
    Ok(())
}
