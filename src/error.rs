//! Error types for rule enforcement.
//!
//! Every fallible operation in the steward returns [`StewardError`]. Most
//! failures are recovered where they happen (a missing zone file becomes an
//! empty registry, a broken rules file becomes default rules). What reaches
//! the tick loop is logged and the tick is abandoned; nothing here is fatal
//! to the process.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: Malformed rules, settings or zone data
//! - **File Errors**: Problems reading configuration or recorded sessions
//! - **Telemetry Errors**: Missing or nonsensical snapshots
//! - **Provider Errors**: Failures inside a telemetry source
//!
//! ## Recovery
//!
//! ```rust
//! use drs_steward::StewardError;
//!
//! let error = StewardError::telemetry_unavailable("shared memory not mapped");
//! if error.is_recoverable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for steward operations.
pub type Result<T, E = StewardError> = std::result::Result<T, E>;

/// Main error type for steward operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StewardError {
    #[error("Configuration error in {context}: {reason}")]
    Configuration { context: String, reason: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Telemetry unavailable: {reason}")]
    TelemetryUnavailable { reason: String },

    #[error("Invalid telemetry field '{field}': {details}")]
    InvalidTelemetry { field: String, details: String },

    #[error("Zone {zone} referenced but registry holds {available} zones")]
    ZoneOutOfRange { zone: usize, available: usize },

    #[error("Telemetry provider failed: {reason}")]
    Provider {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Car '{car}' is not on the allowed car list")]
    CarNotAllowed { car: String },

    #[error("Steward task has stopped")]
    Stopped,
}

impl StewardError {
    /// Returns whether the error only costs the current tick.
    ///
    /// Recoverable errors leave committed state untouched; the next tick
    /// resumes normally.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StewardError::TelemetryUnavailable { .. } => true,
            StewardError::InvalidTelemetry { .. } => true,
            StewardError::ZoneOutOfRange { .. } => true,
            StewardError::Provider { .. } => true,
            StewardError::Configuration { .. } => false,
            StewardError::File { .. } => false,
            StewardError::Parse { .. } => false,
            StewardError::CarNotAllowed { .. } => false,
            StewardError::Stopped => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StewardError::Configuration { .. } => vec![
                "Check the rules and settings files against the documented keys",
                "Remove the file to fall back to default rules",
            ],
            StewardError::File { .. } => vec![
                "Check the file exists and is readable",
                "Verify the track and layout names used to build the path",
            ],
            StewardError::Parse { .. } => vec![
                "Check the file is valid YAML or INI",
                "Verify numeric fields contain plain decimal numbers",
            ],
            StewardError::TelemetryUnavailable { .. } => vec![
                "Ensure the simulator is running and in a session",
                "Wait for the next tick",
            ],
            StewardError::InvalidTelemetry { .. } => vec![
                "Verify the telemetry source is reporting normalized spline positions",
                "Check the monitored car is present in the car list",
            ],
            StewardError::ZoneOutOfRange { .. } => vec![
                "Reload the zone file for the current track",
                "Restart the session after changing track layout",
            ],
            StewardError::Provider { .. } => vec![
                "Check the telemetry source is still connected",
                "Restart the replay or live connection",
            ],
            StewardError::CarNotAllowed { .. } => vec![
                "Add the car to allowed_cars in the settings file",
                "Leave allowed_cars empty to allow every car",
            ],
            StewardError::Stopped => vec![
                "The telemetry source ended or the connection was shut down",
                "Start a new steward for the next session",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(context: impl Into<String>, reason: impl Into<String>) -> Self {
        StewardError::Configuration { context: context.into(), reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StewardError::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        StewardError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for a tick with no usable snapshot.
    pub fn telemetry_unavailable(reason: impl Into<String>) -> Self {
        StewardError::TelemetryUnavailable { reason: reason.into() }
    }

    /// Helper constructor for a snapshot field that fails validation.
    pub fn invalid_telemetry(field: impl Into<String>, details: impl Into<String>) -> Self {
        StewardError::InvalidTelemetry { field: field.into(), details: details.into() }
    }

    /// Helper constructor for provider failures.
    pub fn provider_failed(reason: impl Into<String>) -> Self {
        StewardError::Provider { reason: reason.into(), source: None }
    }

    /// Helper constructor for provider failures with source.
    pub fn provider_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StewardError::Provider { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for StewardError {
    fn from(err: std::io::Error) -> Self {
        StewardError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for StewardError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StewardError::Parse { context: "YAML".to_string(), details: err.to_string() }
    }
}
