//! Calibration session.
//!
//! Drives an `MtsCoordinator` over the simulated device for one or more
//! runs and collects per-run records plus aggregate statistics.

mod outcome;

use std::sync::atomic::{AtomicBool, Ordering};

pub use outcome::{CalibrationOutcome, FailureRecord, RunRecord};

use contracts::{
    CalibrationMode, CalibrationProfile, ConverterType, MtsError, RfdcDriver, TileMask,
};
use mts_engine::{CoordinatorConfig, MtsCoordinator, TargetPlan};
use observability::CalibrationMetricsAggregator;
use rfdc_driver::SimulatedRfdc;
use tracing::{info, instrument, warn};

use crate::error::Result;

/// Session settings taken from the command line
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Number of calibration runs (at least one)
    pub repeat: u32,
    /// Disable SYSREF capture after a successful final run
    pub disable_sysref: bool,
}

/// Run calibration against the profile's simulated device
pub fn calibrate_simulated(
    profile: &CalibrationProfile,
    options: SessionOptions,
    stop: &AtomicBool,
) -> Result<CalibrationOutcome> {
    let driver = profile
        .simulator
        .as_ref()
        .map(SimulatedRfdc::from_profile)
        .unwrap_or_default();
    calibrate(driver, profile, options, stop)
}

/// Run calibration with any driver
///
/// `stop` is checked between runs; a sync already in flight always
/// completes.
#[instrument(name = "calibration_session", skip_all, fields(repeat = options.repeat))]
pub fn calibrate<D: RfdcDriver>(
    driver: D,
    profile: &CalibrationProfile,
    options: SessionOptions,
    stop: &AtomicBool,
) -> Result<CalibrationOutcome> {
    let dac_tiles = TileMask::new(profile.dac.tiles);
    let adc_tiles = TileMask::new(profile.adc.tiles);
    let mut coordinator =
        MtsCoordinator::with_config(driver, CoordinatorConfig::from_profile(profile));

    for (converter, tiles) in [(ConverterType::Dac, dac_tiles), (ConverterType::Adc, adc_tiles)] {
        let missing = coordinator.preflight(converter, tiles)?;
        if !missing.is_empty() {
            warn!(
                converter = %converter,
                tiles = %missing,
                "requested tiles lack MTS support, sync is expected to fail"
            );
        }
    }

    let mut aggregator = CalibrationMetricsAggregator::new();
    let mut runs = Vec::new();

    for iteration in 1..=options.repeat.max(1) {
        if stop.load(Ordering::Relaxed) {
            warn!(iteration, "stop requested, skipping remaining runs");
            break;
        }
        let result = match profile.coordinator.mode {
            CalibrationMode::Auto => coordinator.auto_run_mts(dac_tiles, adc_tiles).map(Some),
            CalibrationMode::Explicit => coordinator
                .init_mts(
                    profile.dac.target_latency,
                    dac_tiles,
                    profile.adc.target_latency,
                    adc_tiles,
                )
                .map(|()| None),
        };

        let record = match result {
            Ok(plan) => completed_run(iteration, plan, &coordinator, &mut aggregator)?,
            Err(err @ MtsError::Sync { .. }) => {
                failed_run(iteration, &err, &coordinator, &mut aggregator)?
            }
            Err(err) => return Err(err.into()),
        };
        info!(iteration, ok = record.ok, "calibration run finished");
        runs.push(record);
    }

    let final_ok = runs.last().is_some_and(|run| run.ok);
    let sysref_disabled = if options.disable_sysref && final_ok {
        let status = coordinator.sysref_disable();
        if !status.is_ok() {
            warn!(status = %status, "SYSREF disable reported an error");
        }
        Some(status)
    } else {
        None
    };

    Ok(CalibrationOutcome {
        mode: profile.coordinator.mode,
        runs,
        sysref_disabled,
        summary: aggregator.summary(),
    })
}

fn completed_run<D: RfdcDriver>(
    iteration: u32,
    plan: Option<TargetPlan>,
    coordinator: &MtsCoordinator<D>,
    aggregator: &mut CalibrationMetricsAggregator,
) -> Result<RunRecord> {
    let reports = completed_reports(coordinator)?;
    for report in &reports {
        aggregator.update(report);
    }
    Ok(RunRecord {
        iteration,
        ok: true,
        plan,
        reports,
        failures: Vec::new(),
        error: None,
    })
}

fn failed_run<D: RfdcDriver>(
    iteration: u32,
    err: &MtsError,
    coordinator: &MtsCoordinator<D>,
    aggregator: &mut CalibrationMetricsAggregator,
) -> Result<RunRecord> {
    for failure in err.failures() {
        aggregator.record_failure(failure);
    }
    // the other converter type may still have completed
    let reports = completed_reports(coordinator)?;
    for report in &reports {
        aggregator.update(report);
    }
    Ok(RunRecord {
        iteration,
        ok: false,
        plan: None,
        reports,
        failures: err.failures().iter().map(FailureRecord::from).collect(),
        error: Some(err.to_string()),
    })
}

fn completed_reports<D: RfdcDriver>(
    coordinator: &MtsCoordinator<D>,
) -> Result<Vec<contracts::SyncReport>> {
    let mut reports = Vec::new();
    for converter in [ConverterType::Dac, ConverterType::Adc] {
        if coordinator.store(converter).is_completed() {
            reports.push(coordinator.report(converter)?);
        }
    }
    Ok(reports)
}
