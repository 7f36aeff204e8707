//! Resolved cooldown policy
//!
//! [`PolicyConfig`] is the immutable snapshot every core component reads.
//! It is built once at load time; string-typed settings from the file are
//! already parsed into closed enums here.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

/// Placeholder replaced by remaining seconds in the indicator title.
pub const SECONDS_PLACEHOLDER: &str = "%seconds%";

/// Placeholder replaced by the leaver's display name in the broadcast.
pub const NICKNAME_PLACEHOLDER: &str = "%nickname%";

pub(crate) const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Longest accepted `cooldown-duration-seconds` (one day). Larger values fall
/// back to the default.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted `tick-interval-ms` (one minute). Larger values fall back
/// to the default.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_DAMAGE: f64 = 10.0;
pub(crate) const DEFAULT_TITLE: &str = "&cPvP Cooldown: &f%seconds%s remaining";
pub(crate) const DEFAULT_BLOCKED_MESSAGE: &str =
    "&cYou cannot use commands while in PvP cooldown!";
pub(crate) const DEFAULT_LOGOUT_MESSAGE: &str =
    "&cYou cannot leave the game while in PvP cooldown! You have been punished.";
pub(crate) const DEFAULT_BROADCAST_MESSAGE: &str = "&e%nickname% left the game during combat!";
pub(crate) const DEFAULT_START_MESSAGE: &str = "&cYou are in PvP cooldown!";
pub(crate) const DEFAULT_END_MESSAGE: &str = "&aYour PvP cooldown has ended.";

/// Immutable tunables shared by all cooldown components.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Cooldown length. Always non-zero.
    pub cooldown: Duration,
    /// Reconciler period. Always non-zero.
    pub tick_interval: Duration,
    /// Countdown indicator.
    pub indicator: IndicatorSettings,
    /// Command restrictions.
    pub commands: CommandPolicy,
    /// Disconnect penalty.
    pub logout: LogoutPolicy,
    /// Start/end notices.
    pub messages: Messages,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            tick_interval: DEFAULT_TICK_INTERVAL,
            indicator: IndicatorSettings::default(),
            commands: CommandPolicy::default(),
            logout: LogoutPolicy::default(),
            messages: Messages::default(),
        }
    }
}

/// Countdown indicator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSettings {
    /// Whether indicators are shown at all.
    pub enabled: bool,
    /// Title template containing [`SECONDS_PLACEHOLDER`].
    pub title: String,
    /// Bar colour.
    pub color: BarColor,
    /// Bar style.
    pub style: BarStyle,
}

impl IndicatorSettings {
    /// Renders the title for the given number of seconds.
    #[must_use]
    pub fn render_title(&self, seconds: u64) -> String {
        self.title.replace(SECONDS_PLACEHOLDER, &seconds.to_string())
    }
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_TITLE.to_owned(),
            color: BarColor::default(),
            style: BarStyle::default(),
        }
    }
}

/// Command restrictions while a cooldown is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPolicy {
    /// Whether commands are restricted at all.
    pub enabled: bool,
    /// Sent when a command is cancelled.
    pub blocked_message: String,
    /// Lower-case base command names without the leading `/`.
    pub whitelist: HashSet<String>,
}

impl CommandPolicy {
    /// Returns whether the raw command text is whitelisted.
    ///
    /// Only the base command is compared, so `/MSG bob hi` matches a
    /// whitelist entry `msg`.
    #[must_use]
    pub fn is_whitelisted(&self, raw_command: &str) -> bool {
        base_command(raw_command).is_some_and(|cmd| self.whitelist.contains(&cmd))
    }
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            blocked_message: DEFAULT_BLOCKED_MESSAGE.to_owned(),
            whitelist: HashSet::new(),
        }
    }
}

/// Extracts the lower-cased base command from raw command text.
///
/// Leading whitespace and command prefixes (`/`) are stripped; the token ends
/// at the first whitespace. Returns `None` for text with no command in it.
#[must_use]
pub fn base_command(raw: &str) -> Option<String> {
    let token = raw
        .trim_start()
        .trim_start_matches('/')
        .split_whitespace()
        .next()?;
    Some(token.to_lowercase())
}

/// Disconnect penalty settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoutPolicy {
    /// Whether disconnects during cooldown are punished.
    pub enabled: bool,
    /// What happens to the leaver.
    pub punishment: Punishment,
    /// Sent to the leaver before the penalty.
    pub message: String,
    /// Broadcast template with [`NICKNAME_PLACEHOLDER`], if enabled.
    pub broadcast: Option<String>,
}

impl LogoutPolicy {
    /// Renders the broadcast for the given nickname, if broadcasting is on.
    #[must_use]
    pub fn render_broadcast(&self, nickname: &str) -> Option<String> {
        self.broadcast
            .as_ref()
            .map(|template| template.replace(NICKNAME_PLACEHOLDER, nickname))
    }
}

impl Default for LogoutPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            punishment: Punishment::Kill,
            message: DEFAULT_LOGOUT_MESSAGE.to_owned(),
            broadcast: None,
        }
    }
}

/// Start and end notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Sent once when a participant enters cooldown.
    pub cooldown_start: String,
    /// Sent once when a cooldown runs out.
    pub cooldown_end: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            cooldown_start: DEFAULT_START_MESSAGE.to_owned(),
            cooldown_end: DEFAULT_END_MESSAGE.to_owned(),
        }
    }
}

/// Penalty for disconnecting during cooldown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Punishment {
    /// Warn only.
    None,
    /// Eliminate the participant.
    Kill,
    /// Subtract this much health; lethal amounts eliminate.
    Damage(f64),
}

impl Punishment {
    /// Health after applying the punishment to `health`.
    ///
    /// Never negative. A result of `0.0` means elimination.
    #[must_use]
    pub fn apply(self, health: f64) -> f64 {
        match self {
            Self::None => health,
            Self::Kill => 0.0,
            Self::Damage(amount) => {
                let left = health - amount;
                if left <= 0.0 { 0.0 } else { left }
            }
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Kill => "kill",
            Self::Damage(_) => "damage",
        }
    }
}

/// Indicator bar colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarColor {
    /// Pink.
    Pink,
    /// Blue.
    Blue,
    /// Red.
    #[default]
    Red,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
    /// Purple.
    Purple,
    /// White.
    White,
}

impl BarColor {
    /// Parses a case-insensitive colour name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PINK" => Some(Self::Pink),
            "BLUE" => Some(Self::Blue),
            "RED" => Some(Self::Red),
            "GREEN" => Some(Self::Green),
            "YELLOW" => Some(Self::Yellow),
            "PURPLE" => Some(Self::Purple),
            "WHITE" => Some(Self::White),
            _ => None,
        }
    }
}

/// Indicator bar segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BarStyle {
    /// One continuous bar.
    #[default]
    #[serde(rename = "SOLID")]
    Solid,
    /// Six segments.
    #[serde(rename = "SEGMENTED_6")]
    Segmented6,
    /// Ten segments.
    #[serde(rename = "SEGMENTED_10")]
    Segmented10,
    /// Twelve segments.
    #[serde(rename = "SEGMENTED_12")]
    Segmented12,
    /// Twenty segments.
    #[serde(rename = "SEGMENTED_20")]
    Segmented20,
}

impl BarStyle {
    /// Parses a case-insensitive style name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SOLID" => Some(Self::Solid),
            "SEGMENTED_6" => Some(Self::Segmented6),
            "SEGMENTED_10" => Some(Self::Segmented10),
            "SEGMENTED_12" => Some(Self::Segmented12),
            "SEGMENTED_20" => Some(Self::Segmented20),
            _ => None,
        }
    }
}
