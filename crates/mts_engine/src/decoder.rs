//! Status decoding.
//!
//! A non-OK status may carry several failure flags at once. Exactly one kind
//! is surfaced per call, picked by `FAILURE_PRIORITY`; the raw status stays
//! available to callers that need every flag.

use contracts::{MtsFailureKind, MtsStatus};

/// Outcome of one sync attempt
pub type SyncOutcome = Result<(), MtsFailureKind>;

/// Failure kinds in the order they are checked
pub const FAILURE_PRIORITY: [MtsFailureKind; 7] = [
    MtsFailureKind::Timeout,
    MtsFailureKind::NotSupported,
    MtsFailureKind::DtcInvalid,
    MtsFailureKind::NotEnabled,
    MtsFailureKind::SysrefGateError,
    MtsFailureKind::SysrefFrequencyNotDone,
    MtsFailureKind::BadReferenceTile,
];

/// Decode a raw sync status
///
/// `MtsStatus::OK` is success. Anything else is an error: the first flag
/// set in priority order, or `Unclassified` when no known flag is set.
pub fn decode_status(status: MtsStatus) -> SyncOutcome {
    if status.is_ok() {
        return Ok(());
    }

    let kind = FAILURE_PRIORITY
        .iter()
        .copied()
        .find(|kind| kind.flag().is_some_and(|flag| status.contains(flag)))
        .unwrap_or(MtsFailureKind::Unclassified);
    Err(kind)
}
