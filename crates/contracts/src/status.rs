//! MTS status codes
//!
//! The vendor sync call returns a bitmask rather than a single code: several
//! failure flags may be set at once. `MtsStatus` keeps the raw value and
//! names the individual flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw status returned by a multi-converter sync call
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MtsStatus(u32);

impl MtsStatus {
    /// Success sentinel (`XRFDC_MTS_OK`)
    pub const OK: Self = Self(0);
    pub const NOT_SUPPORTED: Self = Self(1 << 0);
    pub const TIMEOUT: Self = Self(1 << 1);
    pub const MARKER_RUN: Self = Self(1 << 2);
    pub const MARKER_MISMATCH: Self = Self(1 << 3);
    pub const DELAY_OVER: Self = Self(1 << 4);
    pub const TARGET_LOW: Self = Self(1 << 5);
    pub const IP_NOT_READY: Self = Self(1 << 6);
    pub const DTC_INVALID: Self = Self(1 << 7);
    pub const NOT_ENABLED: Self = Self(1 << 9);
    pub const SYSREF_GATE_ERROR: Self = Self(1 << 11);
    pub const SYSREF_FREQ_NOT_DONE: Self = Self(1 << 12);
    pub const BAD_REF_TILE: Self = Self(1 << 13);

    const NAMED: [(Self, &'static str); 12] = [
        (Self::NOT_SUPPORTED, "NOT_SUPPORTED"),
        (Self::TIMEOUT, "TIMEOUT"),
        (Self::MARKER_RUN, "MARKER_RUN"),
        (Self::MARKER_MISMATCH, "MARKER_MISM"),
        (Self::DELAY_OVER, "DELAY_OVER"),
        (Self::TARGET_LOW, "TARGET_LOW"),
        (Self::IP_NOT_READY, "IP_NOT_READY"),
        (Self::DTC_INVALID, "DTC_INVALID"),
        (Self::NOT_ENABLED, "NOT_ENABLED"),
        (Self::SYSREF_GATE_ERROR, "SYSREF_GATE_ERROR"),
        (Self::SYSREF_FREQ_NOT_DONE, "SYSREF_FREQ_NDONE"),
        (Self::BAD_REF_TILE, "BAD_REF_TILE"),
    ];

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_ok(&self) -> bool {
        self.0 == Self::OK.0
    }

    /// True if every bit of `flag` is set
    #[inline]
    pub const fn contains(&self, flag: Self) -> bool {
        flag.0 != 0 && self.0 & flag.0 == flag.0
    }

    /// Vendor names of all set flags, lowest bit first
    pub fn flag_names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Bits not covered by any named flag
    pub fn unknown_bits(&self) -> u32 {
        let known = Self::NAMED.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        self.0 & !known
    }
}

impl std::ops::BitOr for MtsStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<u32> for MtsStatus {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MtsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("0x0000 (OK)");
        }
        let mut names = self.flag_names().join("|");
        let unknown = self.unknown_bits();
        if unknown != 0 {
            if !names.is_empty() {
                names.push('|');
            }
            names.push_str(&format!("{unknown:#x}"));
        }
        write!(f, "{:#06x} ({names})", self.0)
    }
}

impl fmt::Debug for MtsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MtsStatus({self})")
    }
}

/// Failure class decoded from a non-OK status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MtsFailureKind {
    /// Calibration did not converge in time
    Timeout,
    /// Configuration unsupported by hardware or firmware
    NotSupported,
    /// DTC calibration produced an invalid code
    DtcInvalid,
    /// MTS not enabled for this device or tile set
    NotEnabled,
    /// SYSREF gating failed
    SysrefGateError,
    /// SYSREF frequency measurement incomplete
    SysrefFrequencyNotDone,
    /// Reference tile invalid for the requested tile set
    BadReferenceTile,
    /// No known flag set
    Unclassified,
}

impl MtsFailureKind {
    /// Status flag that identifies this kind; `None` for `Unclassified`
    pub fn flag(&self) -> Option<MtsStatus> {
        match self {
            Self::Timeout => Some(MtsStatus::TIMEOUT),
            Self::NotSupported => Some(MtsStatus::NOT_SUPPORTED),
            Self::DtcInvalid => Some(MtsStatus::DTC_INVALID),
            Self::NotEnabled => Some(MtsStatus::NOT_ENABLED),
            Self::SysrefGateError => Some(MtsStatus::SYSREF_GATE_ERROR),
            Self::SysrefFrequencyNotDone => Some(MtsStatus::SYSREF_FREQ_NOT_DONE),
            Self::BadReferenceTile => Some(MtsStatus::BAD_REF_TILE),
            Self::Unclassified => None,
        }
    }

    /// Short operator-facing description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "multi-tile sync did not complete due to a timeout",
            Self::NotSupported => "multi-tile sync not supported",
            Self::DtcInvalid => "DTC invalid",
            Self::NotEnabled => "multi-tile sync is not enabled",
            Self::SysrefGateError => "SYSREF gate error",
            Self::SysrefFrequencyNotDone => "SYSREF frequency error",
            Self::BadReferenceTile => "bad reference tile",
            Self::Unclassified => "multi-tile sync did not complete successfully",
        }
    }

    /// Metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotSupported => "not_supported",
            Self::DtcInvalid => "dtc_invalid",
            Self::NotEnabled => "not_enabled",
            Self::SysrefGateError => "sysref_gate_error",
            Self::SysrefFrequencyNotDone => "sysref_frequency_not_done",
            Self::BadReferenceTile => "bad_reference_tile",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for MtsFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
