//! Converter types and tile masks
//!
//! An RFdc IP block exposes up to four tiles per converter type. Tiles taking
//! part in a sync pass are selected with a 4-bit mask.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of tiles per converter type
pub const MAX_TILES: usize = 4;

/// Converter type of a tile group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterType {
    Adc,
    Dac,
}

impl ConverterType {
    /// Lower-case name, used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adc => "adc",
            Self::Dac => "dac",
        }
    }

    /// Vendor driver type constant (`XRFDC_ADC_TILE` / `XRFDC_DAC_TILE`)
    pub fn raw(&self) -> u32 {
        match self {
            Self::Adc => 0,
            Self::Dac => 1,
        }
    }
}

impl fmt::Display for ConverterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adc => f.write_str("ADC"),
            Self::Dac => f.write_str("DAC"),
        }
    }
}

/// Tile selection mask
///
/// Bit `i` set means tile `i` takes part in the sync pass. Only bits 0-3 are
/// meaningful; a zero mask disables the converter type.
///
/// # Examples
/// ```
/// use contracts::TileMask;
///
/// let mask = TileMask::new(0b0101);
/// assert!(mask.contains(0));
/// assert!(!mask.contains(1));
/// assert_eq!(mask.tiles().collect::<Vec<_>>(), vec![0, 2]);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileMask(u32);

impl TileMask {
    /// Mask selecting no tile
    pub const NONE: Self = Self(0);
    /// Mask selecting all four tiles
    pub const ALL: Self = Self(0b1111);

    #[inline]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when no bit above tile 3 is set
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 & !Self::ALL.0 == 0
    }

    #[inline]
    pub fn contains(&self, tile: usize) -> bool {
        tile < MAX_TILES && self.0 & (1 << tile) != 0
    }

    /// Enabled tile indices in ascending order
    pub fn tiles(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_TILES).filter(move |&tile| self.contains(tile))
    }

    /// Number of enabled tiles
    pub fn count(&self) -> usize {
        self.tiles().count()
    }
}

impl From<u32> for TileMask {
    #[inline]
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for TileMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06b}", self.0)
    }
}

impl fmt::Debug for TileMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileMask({:#06b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_ascending() {
        let mask = TileMask::new(0b1010);
        assert_eq!(mask.tiles().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(mask.count(), 2);
    }

    #[test]
    fn test_high_bits_invalid() {
        assert!(TileMask::new(0b1111).is_valid());
        assert!(!TileMask::new(0b1_0000).is_valid());
        // bits above tile 3 never count as tiles
        assert_eq!(TileMask::new(0b1_0001).tiles().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileMask::new(3).to_string(), "0b0011");
        assert_eq!(ConverterType::Dac.to_string(), "DAC");
    }

    #[test]
    fn test_serde_transparent() {
        let mask: TileMask = serde_json::from_str("5").unwrap();
        assert_eq!(mask, TileMask::new(5));
        assert_eq!(serde_json::to_string(&mask).unwrap(), "5");
    }
}
