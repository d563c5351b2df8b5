//! CalibrationProfile - Config Loader output
//!
//! Describes one calibration run: tile selection and targets per converter
//! type, coordinator behavior, optional DTC seed codes and, for bench runs,
//! the simulated device.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DtcSeed, MAX_TILES, MEASURE_ONLY_LATENCY};

/// Profile version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileVersion {
    #[default]
    V1,
}

/// Complete calibration profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CalibrationProfile {
    /// Profile version
    #[serde(default)]
    pub version: ProfileVersion,

    /// DAC tile selection and target
    #[serde(default)]
    #[validate(nested)]
    pub dac: ConverterProfile,

    /// ADC tile selection and target
    #[serde(default)]
    #[validate(nested)]
    pub adc: ConverterProfile,

    /// Coordinator behavior
    #[serde(default)]
    #[validate(nested)]
    pub coordinator: CoordinatorProfile,

    /// DTC seed codes for multi-converter init
    #[serde(default)]
    pub seed: DtcSeed,

    /// Simulated device (bench runs only)
    #[serde(default)]
    pub simulator: Option<SimulatorProfile>,
}

/// Tile selection and target latency of one converter type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConverterProfile {
    /// Tile mask, bit i = tile i
    #[serde(default)]
    #[validate(range(max = 15))]
    pub tiles: u32,

    /// Target latency, -1 = measure only. Ignored in auto mode.
    #[serde(default = "default_target_latency")]
    #[validate(range(min = -1))]
    pub target_latency: i32,
}

impl Default for ConverterProfile {
    fn default() -> Self {
        Self {
            tiles: 0,
            target_latency: default_target_latency(),
        }
    }
}

fn default_target_latency() -> i32 {
    MEASURE_ONLY_LATENCY
}

/// How targets are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Use the profile's target latencies as given
    #[default]
    Explicit,
    /// Measure, add margin, then align (DAC only)
    Auto,
}

/// Coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CoordinatorProfile {
    #[serde(default)]
    pub mode: CalibrationMode,

    /// Log a report after each successful pass
    #[serde(default = "default_verbose")]
    pub verbose: bool,

    /// Pause between the DAC and ADC passes (ms)
    #[serde(default = "default_settle_delay_ms")]
    #[validate(range(max = 10_000))]
    pub settle_delay_ms: u64,
}

impl Default for CoordinatorProfile {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::default(),
            verbose: default_verbose(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_verbose() -> bool {
    true
}

fn default_settle_delay_ms() -> u64 {
    500
}

/// Simulated RFdc device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatorProfile {
    #[serde(default)]
    pub dac: SimulatedConverter,
    #[serde(default)]
    pub adc: SimulatedConverter,
}

/// Simulated tiles of one converter type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedConverter {
    /// Latency each tile settles at without a target (T1 ticks)
    #[serde(default = "default_natural_latency")]
    pub natural_latency: [i32; MAX_TILES],

    /// Decimation (ADC) or interpolation (DAC) factor per tile, block 0
    #[serde(default = "default_factor")]
    pub factor: [u32; MAX_TILES],

    /// Fabric words per cycle per tile, block 0
    #[serde(default = "default_sample_words")]
    pub sample_words: [u32; MAX_TILES],

    /// Tiles built without MTS support (mask)
    #[serde(default)]
    pub mts_disabled_tiles: u32,

    #[serde(default = "default_marker_delay")]
    pub marker_delay: i32,

    /// Raw statuses returned by the first sync calls, in order
    #[serde(default)]
    pub inject_status: Vec<u32>,
}

impl Default for SimulatedConverter {
    fn default() -> Self {
        Self {
            natural_latency: default_natural_latency(),
            factor: default_factor(),
            sample_words: default_sample_words(),
            mts_disabled_tiles: 0,
            marker_delay: default_marker_delay(),
            inject_status: Vec::new(),
        }
    }
}

fn default_natural_latency() -> [i32; MAX_TILES] {
    [64, 66, 65, 67]
}

fn default_factor() -> [u32; MAX_TILES] {
    [1; MAX_TILES]
}

fn default_sample_words() -> [u32; MAX_TILES] {
    [8; MAX_TILES]
}

fn default_marker_delay() -> i32 {
    15
}
