//! Calibration results and their console rendering.

use contracts::{
    CalibrationMode, ConverterFailure, ConverterType, MtsFailureKind, MtsStatus, SyncReport,
};
use mts_engine::TargetPlan;
use observability::MetricsSummary;
use serde::Serialize;

/// One failed converter pass, flattened for output
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub converter: ConverterType,
    pub kind: MtsFailureKind,
    pub status: MtsStatus,
    /// Every flag set in `status`
    pub flags: Vec<&'static str>,
}

impl From<&ConverterFailure> for FailureRecord {
    fn from(failure: &ConverterFailure) -> Self {
        Self {
            converter: failure.converter,
            kind: failure.kind,
            status: failure.status,
            flags: failure.status.flag_names(),
        }
    }
}

/// Result of one calibration run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub iteration: u32,
    pub ok: bool,
    /// Planned targets (auto mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TargetPlan>,
    /// Reports of converter types that completed
    pub reports: Vec<SyncReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a calibration session
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationOutcome {
    pub mode: CalibrationMode,
    pub runs: Vec<RunRecord>,
    /// Status of the final SYSREF disable, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysref_disabled: Option<MtsStatus>,
    #[serde(skip)]
    pub summary: MetricsSummary,
}

impl CalibrationOutcome {
    pub fn failed_runs(&self) -> usize {
        self.runs.iter().filter(|run| !run.ok).count()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.runs.iter().rev().find_map(|run| run.error.as_deref())
    }

    /// Print reports and, for repeated runs, the aggregate summary
    pub fn print_summary(&self) {
        for run in &self.runs {
            if self.runs.len() > 1 {
                println!(
                    "\n--- Run {} ({}) ---",
                    run.iteration,
                    if run.ok { "ok" } else { "failed" }
                );
            }
            if let Some(plan) = &run.plan {
                println!(
                    "Planned targets: DAC {} / ADC {}",
                    plan.dac_target_latency, plan.adc_target_latency
                );
            }
            for report in &run.reports {
                println!("{report}");
            }
            for failure in &run.failures {
                println!(
                    "{} sync failed: {} [{}]",
                    failure.converter,
                    failure.kind.description(),
                    failure.status
                );
            }
        }

        if let Some(status) = self.sysref_disabled {
            println!("SYSREF disabled (status {status})");
        }

        if self.runs.len() > 1 {
            println!("\n{}", self.summary);
        }
    }
}
