//! RfdcDriver trait - Synchronization driver port
//!
//! Abstracts the RF data-converter driver operations the MTS coordinator
//! needs. The real register-level driver, the simulated device and the test
//! mock all implement this trait.

use crate::{ConverterType, DriverError, DtcSeed, MtsStatus, SyncConfig};

/// Synchronization driver port
///
/// All calls are blocking. Sync duration is bounded by the hardware's own
/// timeout logic, not by the caller.
///
/// # Example
///
/// ```ignore
/// let mut config = SyncConfig::default();
/// driver.multi_converter_init(&mut config, &DtcSeed::default(), 0)?;
/// config.tiles = TileMask::new(0b0011);
/// config.sysref_enable = true;
/// let status = driver.multi_converter_sync(ConverterType::Dac, &mut config);
/// ```
pub trait RfdcDriver {
    /// Seed `config` with driver defaults
    ///
    /// Clears measured latency, offsets and DTC results. Idempotent, safe to
    /// call before every sync pass.
    ///
    /// # Arguments
    /// * `config` - Record to reinitialize
    /// * `seed` - Optional PLL/T1 DTC codes; `None` entries use driver defaults
    /// * `reference_tile` - Reference tile for the DTC scans
    fn multi_converter_init(
        &mut self,
        config: &mut SyncConfig,
        seed: &DtcSeed,
        reference_tile: u32,
    ) -> Result<(), DriverError>;

    /// Run the latency-alignment sequence for one converter type
    ///
    /// Reads `tiles`, `target_latency`, `reference_tile` and `sysref_enable`
    /// from `config`; writes `latency`, `offset`, `marker_delay` and both DTC
    /// records back, even on failure where the hardware got that far.
    ///
    /// # Returns
    /// Raw status bitmask, `MtsStatus::OK` on success
    fn multi_converter_sync(
        &mut self,
        converter: ConverterType,
        config: &mut SyncConfig,
    ) -> MtsStatus;

    /// Enable or disable SYSREF capture for subsequent sync passes
    fn configure_sysref(
        &mut self,
        dac_config: &SyncConfig,
        adc_config: &SyncConfig,
        enable: bool,
    ) -> MtsStatus;

    /// ADC decimation factor of a tile/block
    fn decimation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError>;

    /// DAC interpolation factor of a tile/block
    fn interpolation_factor(&self, tile: usize, block: usize) -> Result<u32, DriverError>;

    /// Fabric samples delivered per ADC fabric clock cycle
    fn sample_words_per_cycle(&self, tile: usize, block: usize) -> Result<u32, DriverError>;

    /// Whether MTS is enabled in the IP for a tile
    fn mts_enabled(&self, converter: ConverterType, tile: usize) -> Result<bool, DriverError>;
}
