//! MTS 指标收集模块
//!
//! 基于 SyncReport 与同步失败记录收集和统计校准运行指标。

use std::collections::HashMap;

use contracts::{ConverterFailure, ConverterType, MtsFailureKind, SyncReport};
use metrics::{counter, gauge, histogram};

/// 记录一次同步 pass 的结果
///
/// 每次 `multi_converter_sync` 返回并解码后调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_outcome;
///
/// let outcome = decode_status(status);
/// record_sync_outcome(ConverterType::Dac, outcome.err());
/// ```
pub fn record_sync_outcome(converter: ConverterType, failure: Option<MtsFailureKind>) {
    let outcome = failure.map(|kind| kind.as_str()).unwrap_or("ok");
    counter!(
        "rfdc_mts_sync_passes_total",
        "converter" => converter.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录目标 latency
pub fn record_target_latency(converter: ConverterType, target_latency: i32) {
    gauge!("rfdc_mts_target_latency", "converter" => converter.as_str())
        .set(target_latency as f64);
}

/// 记录单个 tile 的 latency 与 offset
pub fn record_tile_latency(converter: ConverterType, tile: usize, latency: i32, offset: i32) {
    let tile = tile.to_string();
    gauge!(
        "rfdc_mts_tile_latency",
        "converter" => converter.as_str(),
        "tile" => tile.clone()
    )
    .set(latency as f64);
    gauge!(
        "rfdc_mts_tile_offset",
        "converter" => converter.as_str(),
        "tile" => tile
    )
    .set(offset as f64);
}

/// 记录一次完整的 auto 校准耗时
pub fn record_auto_run_ms(elapsed_ms: f64) {
    histogram!("rfdc_mts_auto_run_ms").record(elapsed_ms);
}

/// 校准指标聚合器
///
/// 在内存中聚合多次校准结果，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CalibrationMetricsAggregator {
    /// 成功的 pass 数
    pub passes_ok: u64,

    /// 各失败类型次数
    pub failure_counts: HashMap<MtsFailureKind, u64>,

    /// 各 converter 的 tile 间 latency 极差统计
    pub spread_stats: HashMap<ConverterType, RunningStats>,

    /// 各 converter 的 offset 统计
    pub offset_stats: HashMap<ConverterType, RunningStats>,

    /// 各 converter 的最终 latency 统计
    pub latency_stats: HashMap<ConverterType, RunningStats>,
}

impl CalibrationMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录成功的 pass
    pub fn update(&mut self, report: &SyncReport) {
        self.passes_ok += 1;

        let latencies = report.latencies();
        if let (Some(min), Some(max)) = (latencies.iter().min(), latencies.iter().max()) {
            self.spread_stats
                .entry(report.converter)
                .or_default()
                .push(f64::from(*max) - f64::from(*min));
        }

        for tile in &report.tile_reports {
            self.latency_stats
                .entry(report.converter)
                .or_default()
                .push(tile.latency as f64);
            self.offset_stats
                .entry(report.converter)
                .or_default()
                .push(tile.offset as f64);
        }
    }

    /// 记录失败的 pass
    pub fn record_failure(&mut self, failure: &ConverterFailure) {
        *self.failure_counts.entry(failure.kind).or_insert(0) += 1;
    }

    /// 失败总数
    pub fn total_failures(&self) -> u64 {
        self.failure_counts.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let total = self.passes_ok + self.total_failures();
        let stats = |map: &HashMap<ConverterType, RunningStats>| {
            map.iter()
                .map(|(converter, stats)| (*converter, StatsSummary::from(stats)))
                .collect()
        };

        MetricsSummary {
            total_passes: total,
            passes_ok: self.passes_ok,
            failure_rate: if total > 0 {
                self.total_failures() as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            failure_counts: self.failure_counts.clone(),
            latency_spread: stats(&self.spread_stats),
            latency: stats(&self.latency_stats),
            offset: stats(&self.offset_stats),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_passes: u64,
    pub passes_ok: u64,
    pub failure_rate: f64,
    pub failure_counts: HashMap<MtsFailureKind, u64>,
    pub latency_spread: HashMap<ConverterType, StatsSummary>,
    pub latency: HashMap<ConverterType, StatsSummary>,
    pub offset: HashMap<ConverterType, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== MTS Calibration Summary ===")?;
        writeln!(f, "Total passes: {}", self.total_passes)?;
        writeln!(
            f,
            "Successful passes: {} (failure rate {:.2}%)",
            self.passes_ok, self.failure_rate
        )?;

        for converter in [ConverterType::Dac, ConverterType::Adc] {
            if let Some(latency) = self.latency.get(&converter) {
                writeln!(f, "{converter} latency: {latency}")?;
            }
            if let Some(spread) = self.latency_spread.get(&converter) {
                writeln!(f, "{converter} tile spread: {spread}")?;
            }
            if let Some(offset) = self.offset.get(&converter) {
                writeln!(f, "{converter} offset: {offset}")?;
            }
        }

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failures:")?;
            for (kind, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", kind.as_str(), count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
