//! Report assembly.

use contracts::{ConverterType, MtsError, RfdcDriver, SyncReport, TileReport};

use crate::store::SyncConfigStore;

/// Block whose factor is shown in reports
const REPORT_BLOCK: usize = 0;

/// Snapshot a completed pass
///
/// Fails with `NoCompletedSync` when the store holds no completed pass. The
/// factor is queried from the driver for display only.
pub fn build_report<D: RfdcDriver>(
    driver: &D,
    store: &SyncConfigStore,
) -> Result<SyncReport, MtsError> {
    let config = store.completed_config()?;
    let converter = store.converter();

    let tile_reports = config
        .tiles
        .tiles()
        .map(|tile| -> Result<TileReport, MtsError> {
            let factor = match converter {
                ConverterType::Adc => driver.decimation_factor(tile, REPORT_BLOCK)?,
                ConverterType::Dac => driver.interpolation_factor(tile, REPORT_BLOCK)?,
            };
            Ok(TileReport {
                tile,
                latency: config.latency[tile],
                offset: config.offset[tile],
                factor,
                pll: config.dtc_pll.window(tile),
                t1: config.dtc_t1.window(tile),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SyncReport {
        converter,
        tiles: config.tiles,
        target_latency: config.target_latency,
        marker_delay: config.marker_delay,
        status: store.last_status().unwrap_or_default(),
        tile_reports,
    })
}
