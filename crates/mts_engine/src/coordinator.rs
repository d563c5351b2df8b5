//! MTS coordinator implementation.

use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    CalibrationProfile, ConverterFailure, ConverterType, DtcSeed, MtsError, MtsStatus,
    RfdcDriver, SyncConfig, SyncReport, TileMask, MEASURE_ONLY_LATENCY,
};
use observability::metrics::{
    record_auto_run_ms, record_sync_outcome, record_target_latency, record_tile_latency,
};
use tracing::{debug, error, info, instrument, warn};

use crate::decoder::decode_status;
use crate::margin::{adc_margin, adc_target_latency, dac_target_latency, TargetPlan};
use crate::report::build_report;
use crate::store::SyncConfigStore;

const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Log a report after each successful pass
    pub verbose: bool,
    /// Pause between the DAC and ADC passes of one sync
    pub settle_delay: Duration,
    /// DTC codes handed to multi-converter init
    pub seed: DtcSeed,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            settle_delay: DEFAULT_SETTLE_DELAY,
            seed: DtcSeed::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Settings from a calibration profile
    pub fn from_profile(profile: &CalibrationProfile) -> Self {
        Self {
            verbose: profile.coordinator.verbose,
            settle_delay: Duration::from_millis(profile.coordinator.settle_delay_ms),
            seed: profile.seed.clone(),
        }
    }

    /// Builder: verbose reports
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder: settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Multi-tile synchronization coordinator
///
/// Owns the driver and one sync config per converter type. One coordinator
/// drives one device serially; share it across threads only behind a single
/// mutex covering whole init/sync/report cycles.
pub struct MtsCoordinator<D: RfdcDriver> {
    driver: D,
    config: CoordinatorConfig,
    dac: SyncConfigStore,
    adc: SyncConfigStore,
}

impl<D: RfdcDriver> MtsCoordinator<D> {
    /// Create a coordinator with default settings
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, CoordinatorConfig::default())
    }

    pub fn with_config(driver: D, config: CoordinatorConfig) -> Self {
        Self {
            dac: SyncConfigStore::new(ConverterType::Dac, config.seed.clone()),
            adc: SyncConfigStore::new(ConverterType::Adc, config.seed.clone()),
            driver,
            config,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Sync config store of a converter type
    pub fn store(&self, converter: ConverterType) -> &SyncConfigStore {
        match converter {
            ConverterType::Adc => &self.adc,
            ConverterType::Dac => &self.dac,
        }
    }

    /// Sync config as last written by the driver
    ///
    /// After a failed pass this holds whatever the hardware got to write.
    pub fn sync_config(&self, converter: ConverterType) -> &SyncConfig {
        self.store(converter).config()
    }

    /// Reset both configs from the driver, then run [`Self::sync_mts`]
    #[instrument(
        name = "mts_init",
        skip(self),
        fields(dac_tiles = %dac_tiles, adc_tiles = %adc_tiles)
    )]
    pub fn init_mts(
        &mut self,
        dac_target_latency: i32,
        dac_tiles: TileMask,
        adc_target_latency: i32,
        adc_tiles: TileMask,
    ) -> Result<(), MtsError> {
        validate_request(ConverterType::Dac, dac_tiles, dac_target_latency)?;
        validate_request(ConverterType::Adc, adc_tiles, adc_target_latency)?;

        self.dac.reset(&mut self.driver)?;
        self.adc.reset(&mut self.driver)?;

        self.sync_mts(
            dac_target_latency,
            dac_tiles,
            adc_target_latency,
            adc_tiles,
        )
    }

    /// Run one sync pass per enabled converter type, DAC first
    ///
    /// A zero mask skips that type without touching the driver or its
    /// config. Failures of both types are reported together.
    #[instrument(
        name = "mts_sync",
        skip(self),
        fields(dac_tiles = %dac_tiles, adc_tiles = %adc_tiles)
    )]
    pub fn sync_mts(
        &mut self,
        dac_target_latency: i32,
        dac_tiles: TileMask,
        adc_target_latency: i32,
        adc_tiles: TileMask,
    ) -> Result<(), MtsError> {
        validate_request(ConverterType::Dac, dac_tiles, dac_target_latency)?;
        validate_request(ConverterType::Adc, adc_tiles, adc_target_latency)?;

        let mut failures = Vec::new();

        let dac_ran = !dac_tiles.is_empty();
        if let Some(Err(failure)) = self.run_pass(ConverterType::Dac, dac_tiles, dac_target_latency)
        {
            failures.push(failure);
        }

        if dac_ran && !adc_tiles.is_empty() && !self.config.settle_delay.is_zero() {
            debug!(delay_ms = self.config.settle_delay.as_millis() as u64, "settling");
            thread::sleep(self.config.settle_delay);
        }

        if let Some(Err(failure)) = self.run_pass(ConverterType::Adc, adc_tiles, adc_target_latency)
        {
            failures.push(failure);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MtsError::Sync { failures })
        }
    }

    /// Two-phase auto calibration
    ///
    /// 1. Measure natural latency (`init_mts` with -1 targets)
    /// 2. Plan targets: slowest tile plus margin
    /// 3. Align every enabled tile to the planned target (`sync_mts`)
    ///
    /// Only DAC tiles are supported; a non-zero ADC mask fails before any
    /// driver call. A measurement failure aborts before planning.
    #[instrument(
        name = "mts_auto_run",
        skip(self),
        fields(dac_tiles = %dac_tiles, adc_tiles = %adc_tiles)
    )]
    pub fn auto_run_mts(
        &mut self,
        dac_tiles: TileMask,
        adc_tiles: TileMask,
    ) -> Result<TargetPlan, MtsError> {
        if !adc_tiles.is_empty() {
            return Err(MtsError::AdcAutoSequencingUnsupported { tiles: adc_tiles });
        }
        let started = Instant::now();

        info!("phase 1: measuring natural latency");
        self.init_mts(
            MEASURE_ONLY_LATENCY,
            dac_tiles,
            MEASURE_ONLY_LATENCY,
            adc_tiles,
        )?;

        let plan = self.plan_targets(dac_tiles, adc_tiles)?;
        info!(
            dac_target = plan.dac_target_latency,
            adc_target = plan.adc_target_latency,
            "phase 2: targets planned"
        );

        info!("phase 3: applying targets");
        self.sync_mts(
            plan.dac_target_latency,
            dac_tiles,
            plan.adc_target_latency,
            adc_tiles,
        )?;

        record_auto_run_ms(started.elapsed().as_secs_f64() * 1000.0);
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "auto calibration complete");
        Ok(plan)
    }

    /// Plan target latencies from the last completed measurement
    ///
    /// Every tile in a non-zero mask must have been measured by the last
    /// completed pass of its converter type. A zero mask plans a target of 0.
    pub fn plan_targets(
        &self,
        dac_tiles: TileMask,
        adc_tiles: TileMask,
    ) -> Result<TargetPlan, MtsError> {
        let dac_target = if dac_tiles.is_empty() {
            0
        } else {
            let measured = self.measured(ConverterType::Dac, dac_tiles)?;
            dac_target_latency(&measured.latency, dac_tiles)?
        };

        let (adc_target, margin) = if adc_tiles.is_empty() {
            (0, None)
        } else {
            let measured = self.measured(ConverterType::Adc, adc_tiles)?;
            let margin = adc_margin(&self.driver, adc_tiles)?;
            (
                adc_target_latency(&measured.latency, adc_tiles, margin)?,
                Some(margin),
            )
        };

        if !dac_tiles.is_empty() {
            record_target_latency(ConverterType::Dac, dac_target);
        }
        if !adc_tiles.is_empty() {
            record_target_latency(ConverterType::Adc, adc_target);
        }

        Ok(TargetPlan {
            dac_target_latency: dac_target,
            adc_target_latency: adc_target,
            adc_margin: margin,
        })
    }

    /// Enable SYSREF capture; returns the raw driver status
    pub fn sysref_enable(&mut self) -> MtsStatus {
        let status = self
            .driver
            .configure_sysref(self.dac.config(), self.adc.config(), true);
        debug!(status = %status, "SYSREF enabled");
        status
    }

    /// Disable SYSREF capture; returns the raw driver status
    pub fn sysref_disable(&mut self) -> MtsStatus {
        let status = self
            .driver
            .configure_sysref(self.dac.config(), self.adc.config(), false);
        debug!(status = %status, "SYSREF disabled");
        status
    }

    /// Report of the last completed pass of a converter type
    pub fn report(&self, converter: ConverterType) -> Result<SyncReport, MtsError> {
        build_report(&self.driver, self.store(converter))
    }

    /// Tiles in `tiles` whose IP was built without MTS
    pub fn preflight(
        &self,
        converter: ConverterType,
        tiles: TileMask,
    ) -> Result<TileMask, MtsError> {
        let mut missing = 0;
        for tile in tiles.tiles() {
            if !self.driver.mts_enabled(converter, tile)? {
                warn!(converter = %converter, tile, "MTS not enabled for tile");
                missing |= 1u32 << tile;
            }
        }
        Ok(TileMask::new(missing))
    }

    fn measured(&self, converter: ConverterType, tiles: TileMask) -> Result<&SyncConfig, MtsError> {
        let config = self.store(converter).completed_config()?;
        if tiles.tiles().all(|tile| config.tiles.contains(tile)) {
            Ok(config)
        } else {
            Err(MtsError::NoCompletedSync { converter })
        }
    }

    /// Run one converter pass; `None` when the mask is zero
    fn run_pass(
        &mut self,
        converter: ConverterType,
        tiles: TileMask,
        target_latency: i32,
    ) -> Option<Result<(), ConverterFailure>> {
        if tiles.is_empty() {
            debug!(converter = %converter, "no tiles enabled, skipping");
            return None;
        }

        let store = match converter {
            ConverterType::Adc => &mut self.adc,
            ConverterType::Dac => &mut self.dac,
        };
        store.apply(tiles, target_latency);
        let status = self
            .driver
            .multi_converter_sync(converter, store.config_mut());
        store.record(status);

        let outcome = decode_status(status);
        record_sync_outcome(converter, outcome.err());

        match outcome {
            Ok(()) => {
                let config = self.store(converter).config();
                info!(
                    converter = %converter,
                    latency = ?config.latency,
                    offset = ?config.offset,
                    marker_delay = config.marker_delay,
                    "multi-tile sync completed successfully"
                );
                for tile in tiles.tiles() {
                    record_tile_latency(converter, tile, config.latency[tile], config.offset[tile]);
                }
                if self.config.verbose {
                    self.log_report(converter);
                }
                Some(Ok(()))
            }
            Err(kind) => {
                error!(
                    converter = %converter,
                    status = %status,
                    kind = kind.as_str(),
                    "multi-tile sync failed: {kind}"
                );
                Some(Err(ConverterFailure {
                    converter,
                    kind,
                    status,
                }))
            }
        }
    }

    fn log_report(&self, converter: ConverterType) {
        match self.report(converter) {
            Ok(report) => info!("\n{report}"),
            Err(e) => warn!(converter = %converter, error = %e, "report unavailable"),
        }
    }
}

fn validate_request(
    converter: ConverterType,
    tiles: TileMask,
    target_latency: i32,
) -> Result<(), MtsError> {
    if !tiles.is_valid() {
        return Err(MtsError::InvalidTileMask {
            converter,
            mask: tiles,
        });
    }
    if !tiles.is_empty() && target_latency < MEASURE_ONLY_LATENCY {
        return Err(MtsError::InvalidTargetLatency {
            converter,
            value: target_latency,
        });
    }
    Ok(())
}
