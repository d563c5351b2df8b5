//! Multi-converter sync configuration
//!
//! Mirrors the vendor `XRFdc_MultiConverter_Sync_Config` record: the caller
//! fills in tile selection and target latency, the driver writes measured
//! latency, offsets, marker delay and DTC scan results back.

use serde::{Deserialize, Serialize};

use crate::{TileMask, MAX_TILES};

/// Target latency sentinel: measure natural latency, do not align
pub const MEASURE_ONLY_LATENCY: i32 = -1;

/// DTC scan mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Full scan from the initial code
    #[default]
    Init,
    /// Rescan around previously loaded codes
    Reload,
}

/// DTC settings for one calibration stage (PLL or T1)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtcSettings {
    /// Reference tile used for the scan
    pub reference_tile: u32,
    /// True for the PLL stage, false for T1
    pub is_pll: bool,
    /// Per-tile target code
    pub target: [i32; MAX_TILES],
    /// Scan mode
    pub scan_mode: ScanMode,
    /// Selected DTC code per tile
    pub dtc_code: [i32; MAX_TILES],
    /// Number of valid windows found per tile
    pub num_windows: [i32; MAX_TILES],
    pub max_gap: [i32; MAX_TILES],
    pub min_gap: [i32; MAX_TILES],
    pub max_overlap: [i32; MAX_TILES],
}

impl DtcSettings {
    /// Empty PLL-stage settings
    pub fn pll() -> Self {
        Self {
            is_pll: true,
            ..Default::default()
        }
    }

    /// Empty T1-stage settings
    pub fn t1() -> Self {
        Self::default()
    }

    /// Calibration window of a single tile
    pub fn window(&self, tile: usize) -> DtcWindow {
        DtcWindow {
            dtc_code: self.dtc_code[tile],
            num_windows: self.num_windows[tile],
            max_gap: self.max_gap[tile],
            min_gap: self.min_gap[tile],
            max_overlap: self.max_overlap[tile],
        }
    }

    /// Clear scan results, keep stage and scan context
    pub fn clear_results(&mut self) {
        self.dtc_code = [0; MAX_TILES];
        self.num_windows = [0; MAX_TILES];
        self.max_gap = [0; MAX_TILES];
        self.min_gap = [0; MAX_TILES];
        self.max_overlap = [0; MAX_TILES];
    }
}

/// DTC calibration window of one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtcWindow {
    pub dtc_code: i32,
    pub num_windows: i32,
    pub max_gap: i32,
    pub min_gap: i32,
    pub max_overlap: i32,
}

/// Sync configuration for one converter type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Timing reference tile, always 0 before a sync call
    pub reference_tile: u32,
    /// Tiles taking part in the pass
    pub tiles: TileMask,
    /// SYSREF capture requested for the pass
    pub sysref_enable: bool,
    /// Target latency in sample-clock ticks, or `MEASURE_ONLY_LATENCY`
    pub target_latency: i32,
    /// Adjusted delay offset per tile
    pub offset: [i32; MAX_TILES],
    /// Measured latency per tile
    pub latency: [i32; MAX_TILES],
    pub marker_delay: i32,
    pub dtc_pll: DtcSettings,
    pub dtc_t1: DtcSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_tile: 0,
            tiles: TileMask::NONE,
            sysref_enable: false,
            target_latency: MEASURE_ONLY_LATENCY,
            offset: [0; MAX_TILES],
            latency: [0; MAX_TILES],
            marker_delay: 0,
            dtc_pll: DtcSettings::pll(),
            dtc_t1: DtcSettings::t1(),
        }
    }
}

impl SyncConfig {
    /// True when the pass only measures natural latency
    pub fn is_measure_only(&self) -> bool {
        self.target_latency == MEASURE_ONLY_LATENCY
    }

    /// Highest measured latency over the enabled tiles
    pub fn max_latency(&self) -> Option<i32> {
        self.tiles.tiles().map(|tile| self.latency[tile]).max()
    }
}

/// Optional DTC codes handed to the driver's multi-converter init
///
/// `None` lets the driver choose its default codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtcSeed {
    #[serde(default)]
    pub pll_codes: Option<[i32; MAX_TILES]>,
    #[serde(default)]
    pub t1_codes: Option<[i32; MAX_TILES]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_latency_over_enabled_tiles() {
        let config = SyncConfig {
            tiles: TileMask::new(0b0111),
            latency: [10, 14, 9, 99],
            ..Default::default()
        };
        assert_eq!(config.max_latency(), Some(14));
    }

    #[test]
    fn test_max_latency_empty_mask() {
        let config = SyncConfig::default();
        assert_eq!(config.max_latency(), None);
        assert!(config.is_measure_only());
    }

    #[test]
    fn test_dtc_window() {
        let mut settings = DtcSettings::pll();
        settings.dtc_code[2] = 17;
        settings.num_windows[2] = 3;
        let window = settings.window(2);
        assert_eq!(window.dtc_code, 17);
        assert_eq!(window.num_windows, 3);

        settings.clear_results();
        assert_eq!(settings.window(2), DtcWindow::default());
        assert!(settings.is_pll);
    }
}
