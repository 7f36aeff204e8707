//! Raw configuration schema
//!
//! Mirrors the on-disk YAML one-to-one. Every key is optional and enum-like
//! values are kept as strings here; [`Validator`](super::Validator) turns
//! this into a typed [`PolicyConfig`](super::PolicyConfig).
//!
//! Numeric durations are signed so that a negative value reaches the
//! validator (and becomes a warning) instead of failing deserialization.

use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawConfig {
    /// Cooldown length in whole seconds.
    pub cooldown_duration_seconds: Option<i64>,

    /// Reconciler period in milliseconds.
    pub tick_interval_ms: Option<i64>,

    /// Countdown indicator settings.
    #[serde(alias = "indicator")]
    pub bossbar: RawIndicator,

    /// Command restrictions while in cooldown.
    pub command_blocking: RawCommandBlocking,

    /// Disconnect penalty settings.
    pub logout_prevention: RawLogoutPrevention,

    /// Sent when a participant enters cooldown.
    pub cooldown_start_message: Option<String>,

    /// Sent when a cooldown runs out.
    pub cooldown_end_message: Option<String>,
}

/// `bossbar:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawIndicator {
    /// Show the countdown indicator.
    pub enabled: Option<bool>,
    /// Title template; `%seconds%` is replaced with the remaining seconds.
    pub title_format: Option<String>,
    /// Colour name (`RED`, `BLUE`, ...).
    pub color: Option<String>,
    /// Style name (`SOLID`, `SEGMENTED_10`, ...).
    pub style: Option<String>,
}

/// `command-blocking:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawCommandBlocking {
    /// Block commands during cooldown.
    pub enabled: Option<bool>,
    /// Sent when a command is blocked.
    pub blocked_message: Option<String>,
    /// Base command names that stay usable.
    pub whitelist: Vec<String>,
}

/// `logout-prevention:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawLogoutPrevention {
    /// Punish disconnects during cooldown.
    pub enabled: Option<bool>,
    /// `NONE`, `KILL` or `DAMAGE`.
    pub punishment: Option<String>,
    /// Health removed by `DAMAGE`.
    pub damage_amount: Option<f64>,
    /// Sent to the leaving participant before the penalty.
    pub message: Option<String>,
    /// Server-wide announcement.
    pub broadcast_message: RawBroadcast,
}

/// `logout-prevention.broadcast-message:` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawBroadcast {
    /// Announce combat-logging to everyone else.
    pub enabled: Option<bool>,
    /// Template; `%nickname%` is replaced with the leaver's name.
    pub message: Option<String>,
}
