//! Error types for `pvp-cooldown`
//!
//! The cooldown core itself is infallible: stale participants are no-ops and
//! bad tunables degrade to defaults. The errors here cover the outer surfaces
//! (configuration files, scenario replay, CLI I/O) and map to process exit
//! codes.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `pvp-cooldown` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, oversize file, strict warnings)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Scenario file error (unknown participant, bad step timing)
    pub const SCENARIO_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `pvp-cooldown` operations.
#[derive(Debug, Error)]
pub enum CooldownError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scenario replay error
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid command-line usage
    #[error("{0}")]
    Usage(String),
}

impl CooldownError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Scenario(_) => ExitCode::SCENARIO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
///
/// Only structural problems are errors. Unknown enum values, non-positive
/// durations and similar mistakes are reported as [`ValidationIssue`]
/// warnings and replaced by defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Warnings promoted to errors by strict validation
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// Issues that failed the check
        errors: Vec<ValidationIssue>,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value that cannot be defaulted
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single issue found while turning raw configuration into a policy.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted path to the field (e.g. `"logout-prevention.punishment"`)
    pub path: String,
    /// Description of the issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot be used as written
    Error,
    /// A default was substituted; loading continues
    Warning,
}

// ============================================================================
// Scenario Errors
// ============================================================================

/// Errors raised while loading or replaying a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A step references a participant that was never declared
    #[error("unknown participant '{name}' in step {step}")]
    UnknownParticipant {
        /// Participant name as written in the scenario
        name: String,
        /// Zero-based step index
        step: usize,
    },

    /// The same participant name was declared twice
    #[error("participant '{0}' declared more than once")]
    DuplicateParticipant(String),

    /// A duration string could not be parsed
    #[error("invalid duration '{value}' at {location}: {message}")]
    InvalidDuration {
        /// The raw duration text
        value: String,
        /// Where it appeared (e.g. `"steps[3].at"`)
        location: String,
        /// Parser message
        message: String,
    },

    /// Steps are not in chronological order
    #[error("step {step} at {at:?} is earlier than the previous step")]
    OutOfOrder {
        /// Zero-based step index
        step: usize,
        /// Offset of the offending step
        at: std::time::Duration,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `pvp-cooldown` operations.
pub type Result<T> = std::result::Result<T, CooldownError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SCENARIO_ERROR, 4);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: CooldownError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_scenario_error_exit_code() {
        let err: CooldownError = ScenarioError::DuplicateParticipant("alice".into()).into();
        assert_eq!(err.exit_code(), ExitCode::SCENARIO_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: CooldownError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_usage_error_exit_code() {
        let err = CooldownError::Usage("unknown scenario".into());
        assert_eq!(err.exit_code(), ExitCode::USAGE_ERROR);
        assert_eq!(err.to_string(), "unknown scenario");
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "bossbar.color".to_string(),
            message: "unknown color 'MAUVE', using RED".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(
            issue.to_string(),
            "warning: unknown color 'MAUVE', using RED at bossbar.color"
        );
    }

    #[test]
    fn test_unknown_participant_display() {
        let err = ScenarioError::UnknownParticipant {
            name: "mallory".to_string(),
            step: 4,
        };
        assert!(err.to_string().contains("mallory"));
        assert!(err.to_string().contains("step 4"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("config.yml"),
            line: Some(7),
            message: "unexpected token".to_string(),
        };
        assert!(err.to_string().contains("config.yml"));
        assert!(err.to_string().contains("unexpected token"));
    }
}
