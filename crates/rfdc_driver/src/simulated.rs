//! Simulated RFdc device
//!
//! Implements `RfdcDriver` with a deterministic latency model so the
//! coordinator can be exercised without hardware:
//! - measure-only passes report each tile's natural latency
//! - targeted passes align every tile to the target, or fail with
//!   `TARGET_LOW` when the target is below a tile's natural latency
//! - tile mask, reference tile, MTS enable and SYSREF are checked the way
//!   the IP reports them
//! - queued statuses can be injected ahead of the model

use std::collections::VecDeque;

use contracts::{
    ConverterType, DriverError, DtcSeed, DtcSettings, MtsStatus, RfdcDriver, SimulatedConverter,
    SimulatorProfile, SyncConfig, TileMask, MAX_TILES,
};
use tracing::{debug, info, instrument, warn};

/// Blocks per tile
const MAX_BLOCKS: usize = 4;

struct ConverterState {
    model: SimulatedConverter,
    injected: VecDeque<MtsStatus>,
    sync_count: usize,
}

impl ConverterState {
    fn new(model: SimulatedConverter) -> Self {
        let injected = model
            .inject_status
            .iter()
            .copied()
            .map(MtsStatus::from_raw)
            .collect();
        Self {
            model,
            injected,
            sync_count: 0,
        }
    }
}

/// Simulated RFdc device
pub struct SimulatedRfdc {
    dac: ConverterState,
    adc: ConverterState,
    sysref_enabled: bool,
}

impl SimulatedRfdc {
    /// Create a device with default tile models
    pub fn new() -> Self {
        Self::from_profile(&SimulatorProfile::default())
    }

    /// Create a device from a profile's simulator section
    pub fn from_profile(profile: &SimulatorProfile) -> Self {
        Self {
            dac: ConverterState::new(profile.dac.clone()),
            adc: ConverterState::new(profile.adc.clone()),
            sysref_enabled: false,
        }
    }

    /// Queue a raw status for the next sync of `converter`
    pub fn inject_status(&mut self, converter: ConverterType, status: MtsStatus) {
        self.state_mut(converter).injected.push_back(status);
    }

    /// Number of sync calls made for `converter`
    pub fn sync_count(&self, converter: ConverterType) -> usize {
        self.state(converter).sync_count
    }

    /// Global SYSREF capture state
    pub fn sysref_enabled(&self) -> bool {
        self.sysref_enabled
    }

    fn state(&self, converter: ConverterType) -> &ConverterState {
        match converter {
            ConverterType::Adc => &self.adc,
            ConverterType::Dac => &self.dac,
        }
    }

    fn state_mut(&mut self, converter: ConverterType) -> &mut ConverterState {
        match converter {
            ConverterType::Adc => &mut self.adc,
            ConverterType::Dac => &mut self.dac,
        }
    }

    fn check_tile(converter: ConverterType, tile: usize, block: usize) -> Result<(), DriverError> {
        if tile >= MAX_TILES || block >= MAX_BLOCKS {
            return Err(DriverError::InvalidTile {
                converter,
                tile,
                block,
            });
        }
        Ok(())
    }

    /// Status flags raised before any alignment work starts
    fn precheck(model: &SimulatedConverter, config: &SyncConfig) -> MtsStatus {
        let mut status = MtsStatus::OK;
        if config.tiles.is_empty() || !config.tiles.is_valid() {
            status = status | MtsStatus::NOT_SUPPORTED;
        }
        if !config.tiles.contains(config.reference_tile as usize) {
            status = status | MtsStatus::BAD_REF_TILE;
        }
        let disabled = TileMask::new(model.mts_disabled_tiles);
        if config.tiles.tiles().any(|tile| disabled.contains(tile)) {
            status = status | MtsStatus::NOT_ENABLED;
        }
        if !config.sysref_enable {
            status = status | MtsStatus::SYSREF_GATE_ERROR;
        }
        status
    }

    fn fill_dtc(settings: &mut DtcSettings, tile: usize, base: i32) {
        let seeded = settings.target[tile];
        settings.dtc_code[tile] = if seeded != 0 {
            seeded
        } else {
            base + 3 * tile as i32
        };
        settings.num_windows[tile] = 2;
        settings.max_gap[tile] = 22;
        settings.min_gap[tile] = 18;
        settings.max_overlap[tile] = 2;
    }
}

impl Default for SimulatedRfdc {
    fn default() -> Self {
        Self::new()
    }
}

impl RfdcDriver for SimulatedRfdc {
    #[instrument(name = "sim_rfdc_init", skip(self, config, seed))]
    fn multi_converter_init(
        &mut self,
        config: &mut SyncConfig,
        seed: &DtcSeed,
        reference_tile: u32,
    ) -> Result<(), DriverError> {
        *config = SyncConfig {
            reference_tile,
            ..SyncConfig::default()
        };
        config.dtc_pll.reference_tile = reference_tile;
        config.dtc_t1.reference_tile = reference_tile;
        if let Some(codes) = seed.pll_codes {
            config.dtc_pll.target = codes;
        }
        if let Some(codes) = seed.t1_codes {
            config.dtc_t1.target = codes;
        }
        debug!("sync config reinitialized");
        Ok(())
    }

    #[instrument(
        name = "sim_rfdc_sync",
        skip(self, config),
        fields(converter = %converter, tiles = %config.tiles, target = config.target_latency)
    )]
    fn multi_converter_sync(
        &mut self,
        converter: ConverterType,
        config: &mut SyncConfig,
    ) -> MtsStatus {
        let state = self.state_mut(converter);
        state.sync_count += 1;

        if let Some(status) = state.injected.pop_front() {
            warn!(status = %status, "returning injected status");
            return status;
        }

        let status = Self::precheck(&state.model, config);
        if !status.is_ok() {
            warn!(status = %status, "sync rejected");
            return status;
        }

        let model = &state.model;
        for tile in config.tiles.tiles() {
            Self::fill_dtc(&mut config.dtc_pll, tile, 16);
            Self::fill_dtc(&mut config.dtc_t1, tile, 12);
        }
        config.marker_delay = model.marker_delay;

        let natural_max = config
            .tiles
            .tiles()
            .map(|tile| model.natural_latency[tile])
            .max()
            .unwrap_or_default();

        if config.is_measure_only() || config.target_latency < natural_max {
            for tile in config.tiles.tiles() {
                config.latency[tile] = model.natural_latency[tile];
                config.offset[tile] = 0;
            }
            if !config.is_measure_only() {
                warn!(natural_max, "target below natural latency");
                return MtsStatus::TARGET_LOW;
            }
        } else {
            for tile in config.tiles.tiles() {
                config.latency[tile] = config.target_latency;
                config.offset[tile] = config.target_latency - model.natural_latency[tile];
            }
        }

        info!(latency = ?config.latency, offset = ?config.offset, "sync complete");
        MtsStatus::OK
    }

    #[instrument(name = "sim_rfdc_configure_sysref", skip(self, dac_config, adc_config))]
    fn configure_sysref(
        &mut self,
        dac_config: &SyncConfig,
        adc_config: &SyncConfig,
        enable: bool,
    ) -> MtsStatus {
        debug!(
            dac_tiles = %dac_config.tiles,
            adc_tiles = %adc_config.tiles,
            "configuring SYSREF"
        );
        self.sysref_enabled = enable;
        MtsStatus::OK
    }

    fn decimation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        Self::check_tile(ConverterType::Adc, tile, block)?;
        Ok(self.adc.model.factor[tile])
    }

    fn interpolation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        Self::check_tile(ConverterType::Dac, tile, block)?;
        Ok(self.dac.model.factor[tile])
    }

    fn sample_words_per_cycle(&self, tile: usize, block: usize) -> Result<u32, DriverError> {
        Self::check_tile(ConverterType::Adc, tile, block)?;
        Ok(self.adc.model.sample_words[tile])
    }

    fn mts_enabled(&self, converter: ConverterType, tile: usize) -> Result<bool, DriverError> {
        Self::check_tile(converter, tile, 0)?;
        let disabled = TileMask::new(self.state(converter).model.mts_disabled_tiles);
        Ok(!disabled.contains(tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(tiles: u32, target: i32) -> SyncConfig {
        SyncConfig {
            tiles: TileMask::new(tiles),
            sysref_enable: true,
            target_latency: target,
            ..Default::default()
        }
    }

    #[test]
    fn test_measure_reports_natural_latency() {
        let mut sim = SimulatedRfdc::new();
        let mut config = requested(0b0011, -1);
        let status = sim.multi_converter_sync(ConverterType::Dac, &mut config);
        assert!(status.is_ok());
        assert_eq!(&config.latency[..2], &[64, 66]);
        assert_eq!(config.marker_delay, 15);
        assert_eq!(config.dtc_pll.dtc_code[1], 19);
    }

    #[test]
    fn test_target_aligns_tiles() {
        let mut sim = SimulatedRfdc::new();
        let mut config = requested(0b0011, 82);
        assert!(sim
            .multi_converter_sync(ConverterType::Dac, &mut config)
            .is_ok());
        assert_eq!(&config.latency[..2], &[82, 82]);
        assert_eq!(&config.offset[..2], &[18, 16]);
    }

    #[test]
    fn test_target_below_natural() {
        let mut sim = SimulatedRfdc::new();
        let mut config = requested(0b0011, 65);
        let status = sim.multi_converter_sync(ConverterType::Dac, &mut config);
        assert_eq!(status, MtsStatus::TARGET_LOW);
    }

    #[test]
    fn test_precheck_flags_accumulate() {
        let mut profile = SimulatorProfile::default();
        profile.adc.mts_disabled_tiles = 0b0010;
        let mut sim = SimulatedRfdc::from_profile(&profile);

        let mut config = requested(0b0010, -1);
        config.sysref_enable = false;
        let status = sim.multi_converter_sync(ConverterType::Adc, &mut config);
        assert!(status.contains(MtsStatus::BAD_REF_TILE));
        assert!(status.contains(MtsStatus::NOT_ENABLED));
        assert!(status.contains(MtsStatus::SYSREF_GATE_ERROR));
        assert!(!sim.mts_enabled(ConverterType::Adc, 1).unwrap());
    }

    #[test]
    fn test_injected_status_first() {
        let mut sim = SimulatedRfdc::new();
        sim.inject_status(ConverterType::Adc, MtsStatus::TIMEOUT);
        let mut config = requested(0b0001, -1);
        assert_eq!(
            sim.multi_converter_sync(ConverterType::Adc, &mut config),
            MtsStatus::TIMEOUT
        );
        assert!(sim
            .multi_converter_sync(ConverterType::Adc, &mut config)
            .is_ok());
        assert_eq!(sim.sync_count(ConverterType::Adc), 2);
    }

    #[test]
    fn test_seeded_dtc_codes() {
        let mut sim = SimulatedRfdc::new();
        let mut config = SyncConfig::default();
        let seed = DtcSeed {
            pll_codes: Some([30, 31, 32, 33]),
            t1_codes: None,
        };
        sim.multi_converter_init(&mut config, &seed, 0).unwrap();
        config.tiles = TileMask::new(0b0001);
        config.sysref_enable = true;
        sim.multi_converter_sync(ConverterType::Dac, &mut config);
        assert_eq!(config.dtc_pll.dtc_code[0], 30);
        assert_eq!(config.dtc_t1.dtc_code[0], 12);
    }
}
