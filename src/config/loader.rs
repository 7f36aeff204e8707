//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and raw read (UTF-8 BOM stripped)
//! 2. YAML parsing (an empty document means "all defaults")
//! 3. Deserialization to [`RawConfig`]
//! 4. Resolution to [`PolicyConfig`] via the [`Validator`]
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use serde_yaml::Value;

use crate::config::policy::PolicyConfig;
use crate::config::schema::RawConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,
}

/// Limits guarding the loader against oversized input.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,

    /// Maximum number of whitelist entries.
    pub max_whitelist_entries: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("PVP_COOLDOWN_MAX_CONFIG_SIZE", 1024 * 1024),
            max_whitelist_entries: env_or("PVP_COOLDOWN_MAX_WHITELIST", 4096),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The resolved, frozen policy.
    pub config: Arc<PolicyConfig>,

    /// Values that were replaced by defaults.
    pub warnings: Vec<LoadWarning>,
}

/// Warning raised during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a configuration file and returns the frozen policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, or if the YAML
    /// is malformed or has the wrong shape. Bad values inside well-formed
    /// YAML are warnings, not errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > limit {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {limit} bytes"),
            });
        }

        let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw_content, path)
    }

    /// Loads configuration from an in-memory document.
    ///
    /// `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file system checks.
    pub fn load_str(&self, content: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let root: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        let raw: RawConfig = match root {
            Value::Null => RawConfig::default(),
            Value::Mapping(_) => {
                serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                    path: origin.to_path_buf(),
                    line: None,
                    message: format!("Failed to deserialize configuration: {e}"),
                })?
            }
            _ => {
                return Err(ConfigError::ParseError {
                    path: origin.to_path_buf(),
                    line: None,
                    message: "Configuration root must be a mapping".to_string(),
                });
            }
        };

        self.resolve(&raw)
    }

    /// Resolves an already deserialized configuration.
    ///
    /// Used for configuration embedded in other documents (scenario files).
    ///
    /// # Errors
    ///
    /// Returns an error if the whitelist exceeds the configured limit.
    pub fn resolve(&self, raw: &RawConfig) -> Result<LoadResult, ConfigError> {
        let max_entries = self.options.config_limits.max_whitelist_entries;
        if raw.command_blocking.whitelist.len() > max_entries {
            return Err(ConfigError::InvalidValue {
                field: "command-blocking.whitelist".to_string(),
                value: format!("{} entries", raw.command_blocking.whitelist.len()),
                expected: format!("at most {max_entries} entries"),
            });
        }

        let result = Validator::new().validate(raw);
        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            })
            .collect();

        Ok(LoadResult {
            config: Arc::new(result.policy),
            warnings,
        })
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::policy::Punishment;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
cooldown-duration-seconds: 20
bossbar:
  enabled: true
  title-format: "&c%seconds%s"
  color: BLUE
command-blocking:
  whitelist: [msg]
logout-prevention:
  punishment: DAMAGE
  damage-amount: 6
"#,
        );
        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert!(result.warnings.is_empty());
        assert_eq!(result.config.cooldown, Duration::from_secs(20));
        assert_eq!(result.config.logout.punishment, Punishment::Damage(6.0));
        assert!(result.config.commands.whitelist.contains("msg"));
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let file = write_config("");
        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(*result.config, PolicyConfig::default());
    }

    #[test]
    fn test_bom_is_stripped() {
        let result = ConfigLoader::with_defaults()
            .load_str("\u{feff}cooldown-duration-seconds: 3\n", Path::new("bom.yml"))
            .unwrap();
        assert_eq!(result.config.cooldown, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/definitely/not/here.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = ConfigLoader::with_defaults()
            .load_str("bossbar:\n  enabled: [unclosed\n", Path::new("bad.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = ConfigLoader::with_defaults()
            .load_str("cooldown-duration-seconds: soon\n", Path::new("bad.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_non_mapping_root_rejected() {
        let err = ConfigLoader::with_defaults()
            .load_str("- 1\n- 2\n", Path::new("list.yml"))
            .unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let file = write_config("cooldown-duration-seconds: 10\n");
        let loader = ConfigLoader::new(LoaderOptions {
            config_limits: ConfigLimits {
                max_config_size: 4,
                ..ConfigLimits::default()
            },
        });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_whitelist_limit() {
        let loader = ConfigLoader::new(LoaderOptions {
            config_limits: ConfigLimits {
                max_whitelist_entries: 1,
                ..ConfigLimits::default()
            },
        });
        let err = loader
            .load_str("command-blocking:\n  whitelist: [a, b]\n", Path::new("w.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_warnings_carry_location() {
        let result = ConfigLoader::with_defaults()
            .load_str("bossbar:\n  style: WAVY\n", Path::new("w.yml"))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].location.as_deref(), Some("bossbar.style"));
    }

    #[test]
    fn test_config_limits_default() {
        let limits = ConfigLimits::default();
        assert!(limits.max_config_size >= 1024);
        assert!(limits.max_whitelist_entries > 0);
    }
}
