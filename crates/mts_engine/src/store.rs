//! Per-converter sync config store.

use contracts::{
    ConverterType, DriverError, DtcSeed, MtsError, MtsStatus, RfdcDriver, SyncConfig, TileMask,
};
use tracing::{debug, instrument};

/// Reference tile used for every pass
pub const REFERENCE_TILE: u32 = 0;

/// Sync config of one converter type
///
/// Measured fields are only meaningful after a completed sync; `completed`
/// tracks that.
#[derive(Debug, Clone)]
pub struct SyncConfigStore {
    converter: ConverterType,
    config: SyncConfig,
    seed: DtcSeed,
    completed: bool,
    last_status: Option<MtsStatus>,
}

impl SyncConfigStore {
    pub fn new(converter: ConverterType, seed: DtcSeed) -> Self {
        Self {
            converter,
            config: SyncConfig::default(),
            seed,
            completed: false,
            last_status: None,
        }
    }

    pub fn converter(&self) -> ConverterType {
        self.converter
    }

    /// Re-derive a baseline config from the driver, dropping prior results
    ///
    /// Measured fields are cleared here; drivers only fill in what they own.
    #[instrument(
        level = "debug",
        name = "sync_config_reset",
        skip(self, driver),
        fields(converter = %self.converter)
    )]
    pub fn reset<D: RfdcDriver>(&mut self, driver: &mut D) -> Result<(), DriverError> {
        self.completed = false;
        self.last_status = None;
        self.config = SyncConfig::default();
        driver.multi_converter_init(&mut self.config, &self.seed, REFERENCE_TILE)
    }

    /// Set the request fields for the next pass
    pub fn apply(&mut self, tiles: TileMask, target_latency: i32) {
        self.config.reference_tile = REFERENCE_TILE;
        self.config.tiles = tiles;
        self.config.sysref_enable = true;
        self.config.target_latency = target_latency;
        debug!(
            converter = %self.converter,
            tiles = %tiles,
            target_latency,
            "sync config applied"
        );
    }

    /// Record the status of the pass that just ran
    pub fn record(&mut self, status: MtsStatus) {
        self.completed = status.is_ok();
        self.last_status = Some(status);
    }

    /// Config as last written, including partial data from a failed pass
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut SyncConfig {
        &mut self.config
    }

    /// Config of the last pass, only if it completed
    pub fn completed_config(&self) -> Result<&SyncConfig, MtsError> {
        if self.completed {
            Ok(&self.config)
        } else {
            Err(MtsError::NoCompletedSync {
                converter: self.converter,
            })
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Raw status of the last pass, `None` if none ran since reset
    pub fn last_status(&self) -> Option<MtsStatus> {
        self.last_status
    }
}
