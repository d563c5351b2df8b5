//! Error types for CLI operations.

use contracts::MtsError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Calibration profile not found
    #[error("Calibration profile not found: {path}")]
    ProfileNotFound { path: String },

    /// Profile failed to load or validate
    #[error("Invalid calibration profile: {0}")]
    Profile(#[source] MtsError),

    /// Calibration aborted on an argument or driver error
    #[error("Calibration aborted: {0}")]
    Calibration(#[from] MtsError),

    /// One or more calibration runs failed
    #[error("{failed} of {total} calibration runs failed: {last_error}")]
    RunsFailed {
        failed: usize,
        total: usize,
        last_error: String,
    },

    /// Blocking calibration task did not finish
    #[error("Calibration task failed: {message}")]
    Task { message: String },

    /// Shutdown signal received mid-calibration
    #[error("Calibration interrupted by shutdown signal")]
    Interrupted,
}

impl CliError {
    pub fn profile_not_found(path: impl Into<String>) -> Self {
        Self::ProfileNotFound { path: path.into() }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
