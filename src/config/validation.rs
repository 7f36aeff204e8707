//! Configuration validation
//!
//! Turns a [`RawConfig`] into a [`PolicyConfig`]. Nothing in here is fatal:
//! every unusable value is replaced by its documented default and reported
//! as a warning, so a typo in the config file never keeps the cooldown
//! system from starting.
//!
//! Like the loader, the validator collects ALL issues instead of stopping at
//! the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::policy::{
    BarColor, BarStyle, CommandPolicy, DEFAULT_BLOCKED_MESSAGE, DEFAULT_BROADCAST_MESSAGE,
    DEFAULT_COOLDOWN, DEFAULT_DAMAGE, DEFAULT_END_MESSAGE, DEFAULT_LOGOUT_MESSAGE,
    DEFAULT_START_MESSAGE, DEFAULT_TICK_INTERVAL, DEFAULT_TITLE, IndicatorSettings, LogoutPolicy,
    MAX_COOLDOWN, MAX_TICK_INTERVAL, Messages, PolicyConfig, Punishment, SECONDS_PLACEHOLDER,
};
use crate::config::schema::{RawCommandBlocking, RawConfig, RawIndicator, RawLogoutPrevention};
use crate::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of resolving a raw configuration.
#[derive(Debug)]
pub struct ValidationResult {
    /// The resolved policy (defaults substituted where needed).
    pub policy: PolicyConfig,

    /// Every substitution or suspicious value, in file order.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if any default had to be substituted.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns the policy, or fails if there were any warnings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` listing the warnings.
    pub fn into_strict(self, path: &str) -> Result<PolicyConfig, ConfigError> {
        if self.warnings.is_empty() {
            Ok(self.policy)
        } else {
            Err(ConfigError::ValidationError {
                path: path.to_owned(),
                errors: self
                    .warnings
                    .into_iter()
                    .map(|issue| ValidationIssue {
                        severity: Severity::Error,
                        ..issue
                    })
                    .collect(),
            })
        }
    }
}

/// Resolves raw configuration into policy.
#[derive(Debug, Default)]
pub struct Validator {
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `raw` into a policy, collecting warnings.
    pub fn validate(&mut self, raw: &RawConfig) -> ValidationResult {
        self.warnings.clear();

        let cooldown = self.bounded_duration(
            "cooldown-duration-seconds",
            raw.cooldown_duration_seconds,
            Duration::from_secs,
            DEFAULT_COOLDOWN,
            MAX_COOLDOWN,
        );
        let tick_interval = self.bounded_duration(
            "tick-interval-ms",
            raw.tick_interval_ms,
            Duration::from_millis,
            DEFAULT_TICK_INTERVAL,
            MAX_TICK_INTERVAL,
        );

        let policy = PolicyConfig {
            cooldown,
            tick_interval,
            indicator: self.indicator(&raw.bossbar),
            commands: self.commands(&raw.command_blocking),
            logout: self.logout(&raw.logout_prevention),
            messages: Messages {
                cooldown_start: raw
                    .cooldown_start_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_START_MESSAGE.to_owned()),
                cooldown_end: raw
                    .cooldown_end_message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_END_MESSAGE.to_owned()),
            },
        };

        ValidationResult {
            policy,
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn indicator(&mut self, raw: &RawIndicator) -> IndicatorSettings {
        let title = raw
            .title_format
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned());
        if !title.contains(SECONDS_PLACEHOLDER) {
            self.add_warning(
                "bossbar.title-format",
                &format!(
                    "title has no {SECONDS_PLACEHOLDER} placeholder; countdown will not be visible"
                ),
            );
        }

        let color = match raw.color.as_deref() {
            None => BarColor::default(),
            Some(name) => BarColor::from_name(name).unwrap_or_else(|| {
                self.add_warning(
                    "bossbar.color",
                    &format!("unknown color '{name}', using RED"),
                );
                BarColor::Red
            }),
        };

        let style = match raw.style.as_deref() {
            None => BarStyle::default(),
            Some(name) => BarStyle::from_name(name).unwrap_or_else(|| {
                self.add_warning(
                    "bossbar.style",
                    &format!("unknown style '{name}', using SOLID"),
                );
                BarStyle::Solid
            }),
        };

        IndicatorSettings {
            enabled: raw.enabled.unwrap_or(true),
            title,
            color,
            style,
        }
    }

    fn commands(&mut self, raw: &RawCommandBlocking) -> CommandPolicy {
        let mut whitelist = HashSet::new();
        for (i, entry) in raw.whitelist.iter().enumerate() {
            let normalized = entry.trim().trim_start_matches('/').to_lowercase();
            if normalized.is_empty() || normalized.contains(char::is_whitespace) {
                self.add_warning(
                    &format!("command-blocking.whitelist[{i}]"),
                    &format!("'{entry}' is not a command name, ignoring"),
                );
                continue;
            }
            whitelist.insert(normalized);
        }

        CommandPolicy {
            enabled: raw.enabled.unwrap_or(true),
            blocked_message: raw
                .blocked_message
                .clone()
                .unwrap_or_else(|| DEFAULT_BLOCKED_MESSAGE.to_owned()),
            whitelist,
        }
    }

    fn logout(&mut self, raw: &RawLogoutPrevention) -> LogoutPolicy {
        let damage = match raw.damage_amount {
            None => DEFAULT_DAMAGE,
            Some(amount) if amount.is_finite() && amount >= 0.0 => amount,
            Some(amount) => {
                self.add_warning(
                    "logout-prevention.damage-amount",
                    &format!(
                        "damage amount {amount} is not a non-negative number, using {DEFAULT_DAMAGE}"
                    ),
                );
                DEFAULT_DAMAGE
            }
        };

        let punishment = match raw.punishment.as_deref().map(|p| p.trim().to_ascii_uppercase()) {
            None => Punishment::Kill,
            Some(name) => match name.as_str() {
                "NONE" => Punishment::None,
                "KILL" => Punishment::Kill,
                "DAMAGE" => Punishment::Damage(damage),
                _ => {
                    self.add_warning(
                        "logout-prevention.punishment",
                        &format!("unknown punishment '{name}', using NONE"),
                    );
                    Punishment::None
                }
            },
        };

        let broadcast = if raw.broadcast_message.enabled.unwrap_or(false) {
            let template = raw
                .broadcast_message
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_BROADCAST_MESSAGE.to_owned());
            if template.trim().is_empty() {
                self.add_warning(
                    "logout-prevention.broadcast-message.message",
                    "broadcast is enabled but the message is empty; disabling broadcast",
                );
                None
            } else {
                Some(template)
            }
        } else {
            None
        };

        LogoutPolicy {
            enabled: raw.enabled.unwrap_or(true),
            punishment,
            message: raw
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_LOGOUT_MESSAGE.to_owned()),
            broadcast,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Accepts `1..=max` in the given unit; anything else warns and yields
    /// `default`.
    fn bounded_duration(
        &mut self,
        path: &str,
        value: Option<i64>,
        unit: fn(u64) -> Duration,
        default: Duration,
        max: Duration,
    ) -> Duration {
        let Some(v) = value else {
            return default;
        };
        let problem = match u64::try_from(v) {
            Ok(n) if n > 0 && unit(n) <= max => return unit(n),
            Ok(n) if n > 0 => format!("must be at most {}", humantime::format_duration(max)),
            _ => "must be greater than zero".to_owned(),
        };
        self.add_warning(
            path,
            &format!("{v} {problem}, using {}", humantime::format_duration(default)),
        );
        default
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
