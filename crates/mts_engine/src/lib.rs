//! # MTS Engine
//!
//! RFdc 多 tile 同步协调器。
//!
//! 负责：
//! - 每种 converter 的 sync config 状态（`SyncConfigStore`）
//! - 驱动状态码解码（按优先级取一个失败类型）
//! - init / sync / 两阶段 auto calibration 时序
//! - 目标延迟规划与同步报告
//!
//! ## 使用示例
//!
//! ```ignore
//! use mts_engine::{CoordinatorConfig, MtsCoordinator};
//! use contracts::TileMask;
//!
//! let mut coordinator = MtsCoordinator::with_config(driver, CoordinatorConfig::default());
//!
//! // Measure, add margin, align all DAC tiles
//! let plan = coordinator.auto_run_mts(TileMask::new(0b0011), TileMask::NONE)?;
//! println!("DAC target: {}", plan.dac_target_latency);
//! ```

mod coordinator;
mod decoder;
mod margin;
mod report;
mod store;

// Re-exports
pub use coordinator::{CoordinatorConfig, MtsCoordinator};
pub use decoder::{decode_status, SyncOutcome, FAILURE_PRIORITY};
pub use margin::{
    adc_margin, adc_target_latency, dac_target_latency, TargetPlan, DAC_LATENCY_MARGIN,
};
pub use report::build_report;
pub use store::{SyncConfigStore, REFERENCE_TILE};
