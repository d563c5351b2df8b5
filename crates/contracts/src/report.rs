//! SyncReport - Coordinator report output
//!
//! Read-only snapshot of a completed sync pass.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ConverterType, DtcWindow, MtsStatus, TileMask};

/// Per-tile report entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileReport {
    pub tile: usize,
    /// Latency after the pass (T1 clock ticks)
    pub latency: i32,
    /// Adjusted delay offset
    pub offset: i32,
    /// Decimation (ADC) or interpolation (DAC) factor, display only
    pub factor: u32,
    pub pll: DtcWindow,
    pub t1: DtcWindow,
}

/// Report of one converter type's sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub converter: ConverterType,
    pub tiles: TileMask,
    /// Target latency the pass ran with (-1 = measure only)
    pub target_latency: i32,
    pub marker_delay: i32,
    pub status: MtsStatus,
    pub tile_reports: Vec<TileReport>,
}

impl SyncReport {
    /// Latencies of the enabled tiles, in tile order
    pub fn latencies(&self) -> Vec<i32> {
        self.tile_reports.iter().map(|t| t.latency).collect()
    }
}

fn write_window(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    stage: &str,
    w: &DtcWindow,
) -> fmt::Result {
    writeln!(f, "    {prefix}: {stage} DTC Code = {}", w.dtc_code)?;
    writeln!(f, "    {prefix}: {stage} Num Windows = {}", w.num_windows)?;
    writeln!(f, "    {prefix}: {stage} Max Gap = {}", w.max_gap)?;
    writeln!(f, "    {prefix}: {stage} Min Gap = {}", w.min_gap)?;
    writeln!(f, "    {prefix}: {stage} Max Overlap = {}", w.max_overlap)
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.converter;
        writeln!(f, "========== {c} Multi-Tile Sync Report ==========")?;
        for t in &self.tile_reports {
            let prefix = format!("{c}{}", t.tile);
            writeln!(
                f,
                "{prefix}: Latency(T1) = {}, Adjusted Delay Offset({}) = {}, Marker Delay = {}",
                t.latency, t.factor, t.offset, self.marker_delay
            )?;
            writeln!(f, "=== MTS {c} Tile{} PLL Report ===", t.tile)?;
            write_window(f, &prefix, "PLL", &t.pll)?;
            writeln!(f, "=== MTS {c} Tile{} T1 Report ===", t.tile)?;
            write_window(f, &prefix, "T1", &t.t1)?;
        }
        write!(f, "{c} Multi-Tile Synchronization is complete.")
    }
}
