//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{CalibrationMode, CalibrationProfile, TileMask};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    profile_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ProfileSummary>,
}

#[derive(Serialize)]
struct ProfileSummary {
    version: String,
    mode: CalibrationMode,
    dac_tiles: u32,
    dac_target_latency: i32,
    adc_tiles: u32,
    adc_target_latency: i32,
    simulated: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(profile = %args.profile.display(), "Validating calibration profile");

    let result = validate_profile(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Profile validation failed")
    }
}

fn validate_profile(args: &ValidateArgs) -> ValidationResult {
    let profile_path = args.profile.display().to_string();

    // Check file exists
    if !args.profile.exists() {
        return ValidationResult {
            valid: false,
            profile_path,
            error: Some(format!("File not found: {}", args.profile.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.profile) {
        Ok(profile) => {
            let warnings = collect_warnings(&profile);
            ValidationResult {
                valid: true,
                profile_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ProfileSummary {
                    version: format!("{:?}", profile.version),
                    mode: profile.coordinator.mode,
                    dac_tiles: profile.dac.tiles,
                    dac_target_latency: profile.dac.target_latency,
                    adc_tiles: profile.adc.tiles,
                    adc_target_latency: profile.adc.target_latency,
                    simulated: profile.simulator.is_some(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            profile_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect profile warnings (non-fatal issues)
fn collect_warnings(profile: &CalibrationProfile) -> Vec<String> {
    let mut warnings = Vec::new();

    if profile.dac.tiles == 0 && profile.adc.tiles == 0 {
        warnings.push("No DAC or ADC tiles enabled - calibration is a no-op".to_string());
    }

    // tile 0 is always the reference
    for (name, tiles) in [("dac", profile.dac.tiles), ("adc", profile.adc.tiles)] {
        if tiles != 0 && !TileMask::new(tiles).contains(0) {
            warnings.push(format!(
                "{name}.tiles {} excludes reference tile 0 - driver will report BAD_REF_TILE",
                TileMask::new(tiles)
            ));
        }
    }

    if profile.coordinator.mode == CalibrationMode::Auto
        && (profile.dac.target_latency != -1 || profile.adc.target_latency != -1)
    {
        warnings.push("target_latency is ignored in auto mode".to_string());
    }

    if let Some(simulator) = &profile.simulator {
        if !simulator.dac.inject_status.is_empty() || !simulator.adc.inject_status.is_empty() {
            warnings.push("simulator injects statuses - early sync passes will fail".to_string());
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Profile is valid: {}", result.profile_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Mode: {:?}", summary.mode);
            println!(
                "  DAC: tiles {} target {}",
                TileMask::new(summary.dac_tiles),
                summary.dac_target_latency
            );
            println!(
                "  ADC: tiles {} target {}",
                TileMask::new(summary.adc_tiles),
                summary.adc_target_latency
            );
            println!("  Simulated device: {}", summary.simulated);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Profile is invalid: {}", result.profile_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
