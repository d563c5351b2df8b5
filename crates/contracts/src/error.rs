//! Layered error definitions
//!
//! Categorized by source: driver / sync / sequencing / config

use std::fmt;

use thiserror::Error;

use crate::{ConverterType, MtsFailureKind, MtsStatus, TileMask};

/// Transport-level driver failure
///
/// Distinct from MTS status codes: these mean the driver could not talk to
/// the IP block at all.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Tile or block index out of range for this device
    #[error("invalid {converter} tile {tile} block {block}")]
    InvalidTile {
        converter: ConverterType,
        tile: usize,
        block: usize,
    },

    /// Register access failed
    #[error("register access failed: {message}")]
    Transport { message: String },

    /// Query not supported by the driver
    #[error("driver query not supported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// One converter type's failed sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterFailure {
    pub converter: ConverterType,
    pub kind: MtsFailureKind,
    /// Raw status, with every flag the driver set
    pub status: MtsStatus,
}

impl fmt::Display for ConverterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.converter, self.kind, self.status)
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum MtsError {
    // ===== Sync Errors =====
    /// One or both converter passes failed, DAC first
    #[error("multi-tile sync failed: {}", join_failures(.failures))]
    Sync { failures: Vec<ConverterFailure> },

    /// Auto sequencing requested for ADC tiles
    #[error("auto sequencing is not implemented for ADC tiles (requested {tiles})")]
    AdcAutoSequencingUnsupported { tiles: TileMask },

    /// Enabled tiles disagree on the margin inputs
    #[error(
        "ADC tile {tile} {parameter} is {actual}, tile 0 uses {expected}; \
         all enabled tiles must share one configuration"
    )]
    InconsistentTileConfig {
        tile: usize,
        parameter: &'static str,
        expected: u32,
        actual: u32,
    },

    /// Planned target or margin does not fit the latency range
    #[error("{converter} target latency overflows: {detail}")]
    MarginOverflow {
        converter: ConverterType,
        detail: String,
    },

    // ===== Argument Errors =====
    /// Tile mask with bits above tile 3
    #[error("invalid {converter} tile mask {mask}: only tiles 0-3 exist")]
    InvalidTileMask {
        converter: ConverterType,
        mask: TileMask,
    },

    /// Target latency below the measure-only sentinel
    #[error("invalid {converter} target latency {value}: expected >= 0 or -1")]
    InvalidTargetLatency { converter: ConverterType, value: i32 },

    /// Results requested before a completed sync
    #[error("no completed {converter} sync; latency data is stale")]
    NoCompletedSync { converter: ConverterType },

    // ===== Driver Errors =====
    #[error(transparent)]
    Driver(#[from] DriverError),

    // ===== Configuration Errors =====
    /// Profile parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Profile validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_failures(failures: &[ConverterFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MtsError {
    /// Single converter failure
    pub fn sync(converter: ConverterType, kind: MtsFailureKind, status: MtsStatus) -> Self {
        Self::Sync {
            failures: vec![ConverterFailure {
                converter,
                kind,
                status,
            }],
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Failure kind of the first failed converter pass
    pub fn kind(&self) -> Option<MtsFailureKind> {
        match self {
            Self::Sync { failures } => failures.first().map(|f| f.kind),
            _ => None,
        }
    }

    /// Failed converter passes, empty for non-sync errors
    pub fn failures(&self) -> &[ConverterFailure] {
        match self {
            Self::Sync { failures } => failures,
            _ => &[],
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, MtsError>;
