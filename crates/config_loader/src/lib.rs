//! # Config Loader
//!
//! Calibration profile loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON profile files
//! - Validate field ranges and cross-field rules
//! - Produce a `CalibrationProfile`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let profile = ConfigLoader::load_from_path(Path::new("profile.toml")).unwrap();
//! println!("DAC tiles: {:#06b}", profile.dac.tiles);
//! ```

mod parser;
mod validator;

pub use contracts::CalibrationProfile;
pub use parser::ConfigFormat;

use contracts::MtsError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load profiles from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load profile from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<CalibrationProfile, MtsError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load profile from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CalibrationProfile, MtsError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built profile (e.g. after CLI overrides)
    pub fn validate(profile: &CalibrationProfile) -> Result<(), MtsError> {
        validator::validate(profile)
    }

    /// Serialize profile to TOML string
    pub fn to_toml(profile: &CalibrationProfile) -> Result<String, MtsError> {
        toml::to_string_pretty(profile)
            .map_err(|e| MtsError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize profile to JSON string
    pub fn to_json(profile: &CalibrationProfile) -> Result<String, MtsError> {
        serde_json::to_string_pretty(profile)
            .map_err(|e| MtsError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, MtsError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            MtsError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| MtsError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, MtsError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CalibrationProfile, MtsError> {
        let profile = parser::parse(content, format)?;
        validator::validate(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BENCH_TOML: &str = r#"
[dac]
tiles = 3
target_latency = 80

[adc]
tiles = 1

[coordinator]
mode = "explicit"
settle_delay_ms = 0

[simulator.dac]
natural_latency = [64, 66, 65, 67]
factor = [8, 8, 8, 8]
"#;

    #[test]
    fn test_load_from_str_toml() {
        let profile = ConfigLoader::load_from_str(BENCH_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(profile.dac.tiles, 3);
        assert_eq!(profile.adc.target_latency, -1);
        assert_eq!(profile.simulator.unwrap().dac.factor, [8; 4]);
    }

    #[test]
    fn test_round_trip_toml() {
        let profile = ConfigLoader::load_from_str(BENCH_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&profile).unwrap();
        let again = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(profile.dac.target_latency, again.dac.target_latency);
        assert_eq!(profile.coordinator.mode, again.coordinator.mode);
    }

    #[test]
    fn test_toml_to_json() {
        let profile = ConfigLoader::load_from_str(BENCH_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&profile).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(profile.adc.tiles, again.adc.tiles);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "[coordinator]\nmode = \"auto\"\n[adc]\ntiles = 1\n";
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(matches!(result, Err(MtsError::ConfigValidation { .. })));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(BENCH_TOML.as_bytes()).unwrap();

        let profile = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(profile.dac.tiles, 3);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/profile.toml")).unwrap_err();
        assert!(matches!(err, MtsError::Io(_)));
    }
}
