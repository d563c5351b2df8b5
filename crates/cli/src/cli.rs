//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::CalibrationMode;

/// RFdc MTS - multi-tile synchronization harness
#[derive(Parser, Debug)]
#[command(
    name = "rfdc-mts",
    author,
    version,
    about = "RFdc multi-tile synchronization harness",
    long_about = "Runs multi-tile synchronization calibration against an RFdc device.\n\n\
                  Loads a calibration profile, aligns DAC and ADC tile latencies \n\
                  (explicit targets or measure-then-align), and prints sync reports."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RFDC_MTS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RFDC_MTS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level from -v/-q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Prometheus port requested by the command, if any
    pub fn metrics_port(&self) -> Option<u16> {
        match &self.command {
            Commands::Run(args) if args.metrics_port != 0 => Some(args.metrics_port),
            _ => None,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run multi-tile synchronization calibration
    Run(RunArgs),

    /// Validate a calibration profile without running
    Validate(ValidateArgs),

    /// Decode a raw MTS status word
    Decode(DecodeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to calibration profile (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "profile.toml",
        env = "RFDC_MTS_PROFILE"
    )]
    pub profile: PathBuf,

    /// Override calibration mode from profile
    #[arg(long, value_enum, env = "RFDC_MTS_MODE")]
    pub mode: Option<ModeArg>,

    /// Override DAC tile mask (decimal, 0x.. or 0b..)
    #[arg(long, value_parser = parse_u32)]
    pub dac_tiles: Option<u32>,

    /// Override ADC tile mask (decimal, 0x.. or 0b..)
    #[arg(long, value_parser = parse_u32)]
    pub adc_tiles: Option<u32>,

    /// Override DAC target latency (-1 = measure only)
    #[arg(long, allow_hyphen_values = true)]
    pub dac_target: Option<i32>,

    /// Override ADC target latency (-1 = measure only)
    #[arg(long, allow_hyphen_values = true)]
    pub adc_target: Option<i32>,

    /// Number of calibration runs
    #[arg(long, default_value = "1", env = "RFDC_MTS_REPEAT")]
    pub repeat: u32,

    /// Disable SYSREF capture once calibration succeeds
    #[arg(long)]
    pub disable_sysref: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Validate profile and exit without calibrating
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RFDC_MTS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to calibration profile to validate
    #[arg(short, long, default_value = "profile.toml")]
    pub profile: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `decode` command
#[derive(Parser, Debug)]
pub struct DecodeArgs {
    /// Raw status word (decimal, 0x.. or 0b..)
    #[arg(value_parser = parse_u32)]
    pub status: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Calibration mode override
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    /// Use the profile's target latencies
    Explicit,
    /// Measure, add margin, then align (DAC only)
    Auto,
}

impl From<ModeArg> for CalibrationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Explicit => CalibrationMode::Explicit,
            ModeArg::Auto => CalibrationMode::Auto,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Parse an unsigned value in decimal, hex (0x) or binary (0b)
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let trimmed = input.trim().replace('_', "");
    let (digits, radix) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = trimmed
        .strip_prefix("0b")
        .or_else(|| trimmed.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (trimmed.as_str(), 10)
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("invalid value '{input}': {e}"))
}
