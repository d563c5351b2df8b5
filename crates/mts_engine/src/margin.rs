//! Target latency planning.
//!
//! Every tile can only be delayed to reach the common target, never
//! advanced, so the target is the slowest measured tile plus a margin.

use contracts::{ConverterType, MtsError, RfdcDriver, TileMask, MAX_TILES};
use serde::Serialize;
use tracing::debug;

/// Fixed DAC margin in sample-clock ticks
pub const DAC_LATENCY_MARGIN: i32 = 16;

/// Tile and block whose configuration stands in for all ADC tiles
const REPRESENTATIVE_TILE: usize = 0;
const REPRESENTATIVE_BLOCK: usize = 0;

/// Targets computed from a measurement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetPlan {
    pub dac_target_latency: i32,
    pub adc_target_latency: i32,
    /// ADC margin used, `None` when ADC is disabled
    pub adc_margin: Option<i32>,
}

fn max_latency(latency: &[i32; MAX_TILES], tiles: TileMask) -> Option<i32> {
    tiles.tiles().map(|tile| latency[tile]).max()
}

fn add_margin(
    converter: ConverterType,
    latency: &[i32; MAX_TILES],
    tiles: TileMask,
    margin: i32,
) -> Result<i32, MtsError> {
    let Some(max) = max_latency(latency, tiles) else {
        return Ok(0);
    };
    max.checked_add(margin).ok_or_else(|| MtsError::MarginOverflow {
        converter,
        detail: format!("max latency {max} + margin {margin}"),
    })
}

/// DAC target: slowest enabled tile plus `DAC_LATENCY_MARGIN`, 0 if disabled
pub fn dac_target_latency(latency: &[i32; MAX_TILES], tiles: TileMask) -> Result<i32, MtsError> {
    add_margin(ConverterType::Dac, latency, tiles, DAC_LATENCY_MARGIN)
}

/// ADC target: slowest enabled tile plus `margin`, 0 if disabled
pub fn adc_target_latency(
    latency: &[i32; MAX_TILES],
    tiles: TileMask,
    margin: i32,
) -> Result<i32, MtsError> {
    add_margin(ConverterType::Adc, latency, tiles, margin)
}

/// ADC margin: fabric words per cycle times decimation factor
///
/// Each decimated sample spans `decimation` clock ticks, so one fabric cycle
/// of slack scales with both. Tile 0 / block 0 is read as the representative;
/// every other enabled tile must agree with it.
pub fn adc_margin<D: RfdcDriver>(driver: &D, tiles: TileMask) -> Result<i32, MtsError> {
    let words = driver.sample_words_per_cycle(REPRESENTATIVE_TILE, REPRESENTATIVE_BLOCK)?;
    let decimation = driver.decimation_factor(REPRESENTATIVE_TILE, REPRESENTATIVE_BLOCK)?;

    for tile in tiles.tiles().filter(|&t| t != REPRESENTATIVE_TILE) {
        let tile_words = driver.sample_words_per_cycle(tile, REPRESENTATIVE_BLOCK)?;
        if tile_words != words {
            return Err(MtsError::InconsistentTileConfig {
                tile,
                parameter: "fabric words per cycle",
                expected: words,
                actual: tile_words,
            });
        }
        let tile_decimation = driver.decimation_factor(tile, REPRESENTATIVE_BLOCK)?;
        if tile_decimation != decimation {
            return Err(MtsError::InconsistentTileConfig {
                tile,
                parameter: "decimation factor",
                expected: decimation,
                actual: tile_decimation,
            });
        }
    }

    let margin = words
        .checked_mul(decimation)
        .and_then(|m| i32::try_from(m).ok())
        .ok_or_else(|| MtsError::MarginOverflow {
            converter: ConverterType::Adc,
            detail: format!("{words} words x decimation {decimation}"),
        })?;
    debug!(words, decimation, margin, "ADC margin");
    Ok(margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfdc_driver::{DriverCall, MockConfig, MockRfdc};

    #[test]
    fn test_dac_target_from_enabled_tiles() {
        let latency = [10, 14, 9, 0];
        assert_eq!(dac_target_latency(&latency, TileMask::new(0b0111)).unwrap(), 30);
    }

    #[test]
    fn test_dac_target_ignores_disabled_tiles() {
        let latency = [10, 14, 9, 99];
        assert_eq!(dac_target_latency(&latency, TileMask::new(0b0101)).unwrap(), 26);
    }

    #[test]
    fn test_disabled_type_targets_zero() {
        let latency = [10, 14, 9, 0];
        assert_eq!(dac_target_latency(&latency, TileMask::NONE).unwrap(), 0);
        assert_eq!(adc_target_latency(&latency, TileMask::NONE, 8).unwrap(), 0);
    }

    #[test]
    fn test_adc_target() {
        let latency = [20, 18, 0, 0];
        assert_eq!(
            adc_target_latency(&latency, TileMask::new(0b0011), 4 * 2).unwrap(),
            28
        );
    }

    #[test]
    fn test_dac_target_overflow_is_error() {
        let latency = [i32::MAX - 4, 0, 0, 0];
        let err = dac_target_latency(&latency, TileMask::new(0b0001)).unwrap_err();
        assert!(matches!(
            err,
            MtsError::MarginOverflow {
                converter: ConverterType::Dac,
                ..
            }
        ));
    }

    #[test]
    fn test_adc_target_overflow_is_error() {
        let latency = [i32::MAX, 10, 0, 0];
        assert!(matches!(
            adc_target_latency(&latency, TileMask::new(0b0011), 1),
            Err(MtsError::MarginOverflow {
                converter: ConverterType::Adc,
                ..
            })
        ));
    }

    #[test]
    fn test_adc_margin_overflow_is_error() {
        let driver = MockRfdc::with_config(MockConfig {
            sample_words: [65536; MAX_TILES],
            decimation: [32768; MAX_TILES],
            ..Default::default()
        });
        let err = adc_margin(&driver, TileMask::new(0b0001)).unwrap_err();
        assert!(matches!(err, MtsError::MarginOverflow { .. }));
        assert!(err.to_string().contains("65536 words x decimation 32768"));
    }

    #[test]
    fn test_adc_margin_from_tile_zero() {
        let driver = MockRfdc::with_config(MockConfig {
            sample_words: [4; MAX_TILES],
            decimation: [2; MAX_TILES],
            ..Default::default()
        });
        assert_eq!(adc_margin(&driver, TileMask::new(0b0011)).unwrap(), 8);
        assert!(driver.calls().contains(&DriverCall::SampleWordsPerCycle { tile: 0, block: 0 }));
        assert!(driver.calls().contains(&DriverCall::DecimationFactor { tile: 1, block: 0 }));
    }

    #[test]
    fn test_adc_margin_rejects_mixed_decimation() {
        let driver = MockRfdc::with_config(MockConfig {
            sample_words: [4; MAX_TILES],
            decimation: [2, 2, 4, 2],
            ..Default::default()
        });
        let err = adc_margin(&driver, TileMask::new(0b0111)).unwrap_err();
        assert!(matches!(
            err,
            MtsError::InconsistentTileConfig {
                tile: 2,
                expected: 2,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_adc_margin_rejects_mixed_words() {
        let driver = MockRfdc::with_config(MockConfig {
            sample_words: [4, 8, 4, 4],
            ..Default::default()
        });
        let err = adc_margin(&driver, TileMask::new(0b0011)).unwrap_err();
        assert!(err.to_string().contains("fabric words per cycle"));
    }

    #[test]
    fn test_adc_margin_propagates_driver_error() {
        let driver = MockRfdc::with_config(MockConfig {
            fail_queries: true,
            ..Default::default()
        });
        assert!(matches!(
            adc_margin(&driver, TileMask::new(0b0001)),
            Err(MtsError::Driver(_))
        ));
    }
}
