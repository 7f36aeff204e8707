//! `validate` command handler

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, CooldownError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    warnings: Vec<WarningEntry>,
}

#[derive(Debug, Serialize)]
struct WarningEntry {
    location: Option<String>,
    message: String,
}

/// Validate configuration files without running anything.
///
/// Stops at the first file that fails to load.
///
/// # Errors
///
/// Returns an I/O error for missing files, a configuration error for
/// malformed files, and, with `--strict`, a validation error for any file
/// that needed a default substituted.
pub fn run(args: &ValidateArgs) -> Result<(), CooldownError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        if !path.exists() {
            return Err(CooldownError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating configuration");

        let load_result = loader.load(path)?;
        for warning in &load_result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }

        if args.strict && !load_result.warnings.is_empty() {
            return Err(strict_failure(path, &load_result.warnings).into());
        }

        tracing::info!(file = %path.display(), "configuration valid");
        reports.push(FileReport {
            path: path.display().to_string(),
            warnings: load_result
                .warnings
                .into_iter()
                .map(|w| WarningEntry {
                    location: w.location,
                    message: w.message,
                })
                .collect(),
        });
    }

    match args.format {
        OutputFormat::Json => {
            let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();
            let output = serde_json::json!({
                "files": reports,
                "summary": { "files": reports.len(), "warnings": warnings },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            for report in &reports {
                println!("{}: ok", report.path);
                for warning in &report.warnings {
                    match &warning.location {
                        Some(location) => println!("  warning: {} at {location}", warning.message),
                        None => println!("  warning: {}", warning.message),
                    }
                }
            }
        }
    }

    Ok(())
}

fn strict_failure(path: &Path, warnings: &[LoadWarning]) -> ConfigError {
    ConfigError::ValidationError {
        path: path.display().to_string(),
        errors: warnings
            .iter()
            .map(|w| ValidationIssue {
                path: w.location.clone().unwrap_or_default(),
                message: w.message.clone(),
                severity: Severity::Error,
            })
            .collect(),
    }
}
