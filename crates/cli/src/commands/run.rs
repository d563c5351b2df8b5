//! `run` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::{CalibrationProfile, TileMask};

use crate::calibration::{calibrate_simulated, SessionOptions};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_calibration(args: &RunArgs) -> Result<()> {
    info!(profile = %args.profile.display(), "Loading calibration profile");

    // Validate profile path
    if !args.profile.exists() {
        return Err(CliError::profile_not_found(args.profile.display().to_string()).into());
    }

    // Load and parse profile
    let mut profile = config_loader::ConfigLoader::load_from_path(&args.profile)
        .map_err(CliError::Profile)
        .with_context(|| format!("Failed to load profile from {}", args.profile.display()))?;

    // Apply CLI overrides, then re-check the combined result
    apply_overrides(&mut profile, args);
    config_loader::ConfigLoader::validate(&profile).map_err(CliError::Profile)?;

    info!(
        mode = ?profile.coordinator.mode,
        dac_tiles = %TileMask::new(profile.dac.tiles),
        dac_target = profile.dac.target_latency,
        adc_tiles = %TileMask::new(profile.adc.tiles),
        adc_target = profile.adc.target_latency,
        "Profile loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - profile is valid, exiting");
        print_profile_summary(&profile);
        return Ok(());
    }

    if profile.simulator.is_none() {
        warn!("Profile has no [simulator] section, using default simulated tiles");
    }

    let options = SessionOptions {
        repeat: args.repeat,
        disable_sysref: args.disable_sysref,
    };
    let stop = Arc::new(AtomicBool::new(false));
    let task_stop = Arc::clone(&stop);
    let mut task =
        tokio::task::spawn_blocking(move || calibrate_simulated(&profile, options, &task_stop));

    info!("Starting calibration...");

    let outcome = tokio::select! {
        joined = &mut task => {
            joined.map_err(|e| CliError::task(e.to_string()))??
        }
        _ = shutdown_signal() => {
            // a sync pass cannot be cancelled; let the current one return
            warn!("Received shutdown signal, waiting for the current sync to return");
            stop.store(true, Ordering::Relaxed);
            if let Err(e) = task.await {
                warn!(error = %e, "Calibration task ended abnormally");
            }
            return Err(CliError::Interrupted.into());
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&outcome)
            .context("Failed to serialize calibration outcome")?;
        println!("{json}");
    } else {
        outcome.print_summary();
    }

    let failed = outcome.failed_runs();
    if failed > 0 {
        return Err(CliError::RunsFailed {
            failed,
            total: outcome.runs.len(),
            last_error: outcome.last_error().unwrap_or("unknown").to_string(),
        }
        .into());
    }

    info!(runs = outcome.runs.len(), "Calibration finished");
    Ok(())
}

fn apply_overrides(profile: &mut CalibrationProfile, args: &RunArgs) {
    if let Some(mode) = args.mode {
        info!(mode = ?mode, "Overriding calibration mode from CLI");
        profile.coordinator.mode = mode.into();
    }
    if let Some(tiles) = args.dac_tiles {
        profile.dac.tiles = tiles;
    }
    if let Some(tiles) = args.adc_tiles {
        profile.adc.tiles = tiles;
    }
    if let Some(target) = args.dac_target {
        profile.dac.target_latency = target;
    }
    if let Some(target) = args.adc_target {
        profile.adc.target_latency = target;
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print profile summary for dry-run mode
fn print_profile_summary(profile: &CalibrationProfile) {
    println!("\n=== Calibration Profile ===\n");
    println!("Mode: {:?}", profile.coordinator.mode);
    println!(
        "DAC: tiles {} target {}",
        TileMask::new(profile.dac.tiles),
        profile.dac.target_latency
    );
    println!(
        "ADC: tiles {} target {}",
        TileMask::new(profile.adc.tiles),
        profile.adc.target_latency
    );
    println!(
        "Settle delay: {} ms, verbose reports: {}",
        profile.coordinator.settle_delay_ms, profile.coordinator.verbose
    );
    if let Some(codes) = profile.seed.pll_codes {
        println!("PLL DTC seed: {codes:?}");
    }
    if let Some(codes) = profile.seed.t1_codes {
        println!("T1 DTC seed: {codes:?}");
    }
    if let Some(simulator) = &profile.simulator {
        println!("\nSimulated device:");
        println!("  DAC natural latency: {:?}", simulator.dac.natural_latency);
        println!("  ADC natural latency: {:?}", simulator.adc.natural_latency);
    }
    println!();
}
